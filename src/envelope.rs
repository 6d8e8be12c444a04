//! Uniform result shape handed to the renderer.

use crate::aws::{
    Cluster, ClusterParameter, ClusterParameterGroup, ClusterSecurityGroup, ClusterSnapshot,
    ClusterSubnetGroup, Event, HsmClientCertificate, HsmConfiguration, TaggedResource,
};
use crate::error::{RemoteCallError, WalkError};
use crate::page::{Cursor, PageResult};
use crate::walker::{Completion, Listing};
use chrono::{DateTime, SecondsFormat, Utc};

/// A row-shaped view of a listed resource.
pub trait Record {
    fn headers() -> &'static [&'static str];

    fn cells(&self) -> Vec<String>;

    /// Column holding a lifecycle status, coloured when rendered.
    fn status_column() -> Option<usize> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    /// Everything requested was listed. `next_token` is set when more data
    /// remains past a limit or a single page. `limit_reached` marks a walk
    /// stopped by the item limit, which may leave data behind even without a
    /// token to resume from.
    Items {
        items: Vec<T>,
        next_token: Option<Cursor>,
        limit_reached: bool,
    },
    /// The listing stopped early; `items` holds what arrived before the error.
    Partial { items: Vec<T>, error: WalkError },
    Error(RemoteCallError),
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Items { .. })
    }

    pub fn items(&self) -> &[T] {
        match self {
            Self::Items { items, .. } | Self::Partial { items, .. } => items,
            Self::Error(_) => &[],
        }
    }
}

impl<T> From<Listing<T>> for Envelope<T> {
    fn from(listing: Listing<T>) -> Self {
        match listing.completion {
            Completion::Exhausted => Self::Items {
                items: listing.items,
                next_token: None,
                limit_reached: false,
            },
            Completion::LimitReached { resume } => Self::Items {
                items: listing.items,
                next_token: resume,
                limit_reached: true,
            },
            Completion::Interrupted(error) => Self::Partial {
                items: listing.items,
                error,
            },
        }
    }
}

impl<T> From<Result<PageResult<T>, RemoteCallError>> for Envelope<T> {
    fn from(result: Result<PageResult<T>, RemoteCallError>) -> Self {
        match result {
            Ok(page) => Self::Items {
                items: page.items,
                next_token: page.next_cursor,
                limit_reached: false,
            },
            Err(e) => Self::Error(e),
        }
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

fn time(value: &Option<DateTime<Utc>>) -> String {
    value
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".to_string())
}

impl Record for Cluster {
    fn headers() -> &'static [&'static str] {
        &["Identifier", "Status", "NodeType", "Nodes", "Database", "Endpoint", "Created"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.identifier.clone(),
            text(&self.status),
            text(&self.node_type),
            self.number_of_nodes
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
            text(&self.db_name),
            text(&self.endpoint),
            time(&self.created),
        ]
    }

    fn status_column() -> Option<usize> {
        Some(1)
    }
}

impl Record for ClusterSnapshot {
    fn headers() -> &'static [&'static str] {
        &["Identifier", "Status", "Cluster", "Type", "Created"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.identifier.clone(),
            text(&self.status),
            text(&self.cluster_identifier),
            text(&self.snapshot_type),
            time(&self.created),
        ]
    }

    fn status_column() -> Option<usize> {
        Some(1)
    }
}

impl Record for ClusterParameterGroup {
    fn headers() -> &'static [&'static str] {
        &["Name", "Family", "Description"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            text(&self.family),
            text(&self.description),
        ]
    }
}

impl Record for ClusterParameter {
    fn headers() -> &'static [&'static str] {
        &["Name", "Value", "Source", "ApplyType", "Modifiable"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            text(&self.value),
            text(&self.source),
            text(&self.apply_type),
            self.is_modifiable
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]
    }
}

impl Record for ClusterSecurityGroup {
    fn headers() -> &'static [&'static str] {
        &["Name", "Description", "EC2SecurityGroups", "IPRanges"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            text(&self.description),
            self.ec2_security_groups.to_string(),
            self.ip_ranges.to_string(),
        ]
    }
}

impl Record for ClusterSubnetGroup {
    fn headers() -> &'static [&'static str] {
        &["Name", "Status", "VpcId", "Subnets"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            text(&self.status),
            text(&self.vpc_id),
            self.subnets.to_string(),
        ]
    }

    fn status_column() -> Option<usize> {
        Some(1)
    }
}

impl Record for HsmClientCertificate {
    fn headers() -> &'static [&'static str] {
        &["Identifier", "PublicKey", "Tags"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.identifier.clone(),
            if self.has_public_key { "yes" } else { "no" }.to_string(),
            self.tags.to_string(),
        ]
    }
}

impl Record for HsmConfiguration {
    fn headers() -> &'static [&'static str] {
        &["Identifier", "IpAddress", "Partition", "Description"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.identifier.clone(),
            text(&self.ip_address),
            text(&self.partition_name),
            text(&self.description),
        ]
    }
}

impl Record for Event {
    fn headers() -> &'static [&'static str] {
        &["Date", "SourceType", "Source", "Severity", "Message"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            time(&self.date),
            text(&self.source_type),
            text(&self.source_identifier),
            text(&self.severity),
            text(&self.message),
        ]
    }
}

impl Record for TaggedResource {
    fn headers() -> &'static [&'static str] {
        &["Resource", "Type", "Key", "Value"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            text(&self.resource_name),
            text(&self.resource_type),
            text(&self.key),
            text(&self.value),
        ]
    }
}
