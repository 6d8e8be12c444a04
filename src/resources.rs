use crate::aws::{
    AwsRedshiftClient, DescribeClusterParameterGroupsInput, DescribeClusterParametersInput,
    DescribeClusterSecurityGroupsInput, DescribeClusterSnapshotsInput,
    DescribeClusterSubnetGroupsInput, DescribeClustersInput, DescribeEventsInput,
    DescribeHsmClientCertificatesInput, DescribeHsmConfigurationsInput, DescribeTagsInput,
    Endpoint,
};
use crate::envelope::{Envelope, Record};
use crate::error::Error;
use crate::page::{Cursor, PageBounds, PageRequest, WalkConfig};
use crate::utils::{parse_since_argument, whole_minutes};
use crate::walker::{walk_one_page, Cancellation, FetchPage, PageWalker};
use crate::writer::Writer;
use chrono::{DateTime, Utc};
use eyre::{Result, WrapErr};
use std::time::Duration;
use structopt::StructOpt;
use termcolor::WriteColor;

/// `MaxRecords` accepted by every Redshift list operation.
pub const REDSHIFT_PAGE_BOUNDS: PageBounds = PageBounds::between(20, 100);

#[derive(Debug, StructOpt)]
pub enum Resource {
    /// Provisioned clusters
    Clusters {
        #[structopt(long)]
        cluster_identifier: Option<String>,
    },
    /// Cluster snapshots
    Snapshots {
        #[structopt(long)]
        cluster_identifier: Option<String>,
        #[structopt(long)]
        snapshot_identifier: Option<String>,
        /// "automated" or "manual"
        #[structopt(long)]
        snapshot_type: Option<String>,
        /// Only snapshots created after this time
        #[structopt(long, parse(try_from_str = parse_since_argument))]
        since: Option<DateTime<Utc>>,
    },
    /// Cluster parameter groups
    ParameterGroups {
        #[structopt(long)]
        parameter_group_name: Option<String>,
    },
    /// Parameters of one parameter group
    Parameters {
        parameter_group_name: String,
        /// "user" or "engine-default"
        #[structopt(long)]
        source: Option<String>,
    },
    /// Cluster security groups
    SecurityGroups {
        #[structopt(long)]
        security_group_name: Option<String>,
    },
    /// Cluster subnet groups
    SubnetGroups {
        #[structopt(long)]
        subnet_group_name: Option<String>,
    },
    /// HSM client certificates
    HsmClientCertificates {
        #[structopt(long)]
        identifier: Option<String>,
    },
    /// HSM configurations
    HsmConfigurations {
        #[structopt(long)]
        identifier: Option<String>,
    },
    /// Events for clusters, snapshots, groups and subscriptions
    Events {
        #[structopt(long)]
        source_identifier: Option<String>,
        #[structopt(long)]
        source_type: Option<String>,
        #[structopt(long, parse(try_from_str = parse_since_argument))]
        since: Option<DateTime<Utc>>,
        /// How far back to look, e.g. "2h"
        #[structopt(long, parse(try_from_str = humantime::parse_duration))]
        duration: Option<Duration>,
    },
    /// Tags attached to resources
    Tags {
        /// Resource ARN
        #[structopt(long)]
        resource_name: Option<String>,
        #[structopt(long)]
        resource_type: Option<String>,
    },
}

#[derive(Debug, Default, StructOpt)]
pub struct PagingOpts {
    /// Stop after this many items; not allowed with --no-paginate
    #[structopt(long, global = true)]
    pub max_items: Option<u64>,

    /// Resume from the NextToken printed by an earlier listing
    #[structopt(long, global = true)]
    pub starting_token: Option<String>,

    /// Items to request per call
    #[structopt(long, global = true)]
    pub page_size: Option<u32>,

    /// Fetch a single page and print its NextToken; --page-size sets its size
    #[structopt(long, global = true)]
    pub no_paginate: bool,
}

impl PagingOpts {
    fn start_cursor(&self) -> Result<Option<Cursor>, Error> {
        match &self.starting_token {
            Some(token) => Cursor::new(token.as_str())
                .map(Some)
                .ok_or(Error::EmptyStartingToken),
            None => Ok(None),
        }
    }

    fn walk_config(&self, bounds: PageBounds) -> Result<WalkConfig, Error> {
        let mut config = WalkConfig::new(bounds);
        config.page_size = self.page_size;
        config.start_cursor = self.start_cursor()?;
        config.total_limit = self.max_items;
        Ok(config)
    }
}

/// List one resource type and render the result, returning whether the
/// listing completed without error.
pub async fn list<C, W>(
    client: &C,
    resource: Resource,
    paging: &PagingOpts,
    cancel: Cancellation,
    writer: &mut Writer<W>,
) -> Result<bool>
where
    C: AwsRedshiftClient + ?Sized,
    W: WriteColor,
{
    tracing::debug!(resource = ?resource, "listing resource");
    match resource {
        Resource::Clusters { cluster_identifier } => {
            let input = DescribeClustersInput {
                cluster_identifier,
                ..Default::default()
            };
            run(&Endpoint::new(client, input), paging, cancel, writer).await
        }
        Resource::Snapshots {
            cluster_identifier,
            snapshot_identifier,
            snapshot_type,
            since,
        } => {
            let input = DescribeClusterSnapshotsInput {
                cluster_identifier,
                snapshot_identifier,
                snapshot_type,
                start_time: since,
                ..Default::default()
            };
            run(&Endpoint::new(client, input), paging, cancel, writer).await
        }
        Resource::ParameterGroups {
            parameter_group_name,
        } => {
            let input = DescribeClusterParameterGroupsInput {
                parameter_group_name,
                ..Default::default()
            };
            run(&Endpoint::new(client, input), paging, cancel, writer).await
        }
        Resource::Parameters {
            parameter_group_name,
            source,
        } => {
            let input = DescribeClusterParametersInput {
                parameter_group_name,
                source,
                ..Default::default()
            };
            run(&Endpoint::new(client, input), paging, cancel, writer).await
        }
        Resource::SecurityGroups {
            security_group_name,
        } => {
            let input = DescribeClusterSecurityGroupsInput {
                cluster_security_group_name: security_group_name,
                ..Default::default()
            };
            run(&Endpoint::new(client, input), paging, cancel, writer).await
        }
        Resource::SubnetGroups { subnet_group_name } => {
            let input = DescribeClusterSubnetGroupsInput {
                cluster_subnet_group_name: subnet_group_name,
                ..Default::default()
            };
            run(&Endpoint::new(client, input), paging, cancel, writer).await
        }
        Resource::HsmClientCertificates { identifier } => {
            let input = DescribeHsmClientCertificatesInput {
                hsm_client_certificate_identifier: identifier,
                ..Default::default()
            };
            run(&Endpoint::new(client, input), paging, cancel, writer).await
        }
        Resource::HsmConfigurations { identifier } => {
            let input = DescribeHsmConfigurationsInput {
                hsm_configuration_identifier: identifier,
                ..Default::default()
            };
            run(&Endpoint::new(client, input), paging, cancel, writer).await
        }
        Resource::Events {
            source_identifier,
            source_type,
            since,
            duration,
        } => {
            let input = DescribeEventsInput {
                source_identifier,
                source_type,
                start_time: since,
                duration_minutes: duration.map(whole_minutes),
                ..Default::default()
            };
            run(&Endpoint::new(client, input), paging, cancel, writer).await
        }
        Resource::Tags {
            resource_name,
            resource_type,
        } => {
            let input = DescribeTagsInput {
                resource_name,
                resource_type,
                ..Default::default()
            };
            run(&Endpoint::new(client, input), paging, cancel, writer).await
        }
    }
}

async fn run<T, F, W>(
    endpoint: &F,
    paging: &PagingOpts,
    cancel: Cancellation,
    writer: &mut Writer<W>,
) -> Result<bool>
where
    F: FetchPage<T> + ?Sized,
    T: Record,
    W: WriteColor,
{
    let envelope = collect(endpoint, paging, REDSHIFT_PAGE_BOUNDS, cancel)
        .await
        .wrap_err("listing resources")?;
    writer.render(&envelope).wrap_err("rendering listing")?;
    Ok(envelope.is_success())
}

/// Walk an endpoint according to the paging options.
pub async fn collect<T, F>(
    endpoint: &F,
    paging: &PagingOpts,
    bounds: PageBounds,
    cancel: Cancellation,
) -> Result<Envelope<T>, Error>
where
    F: FetchPage<T> + ?Sized,
{
    if paging.no_paginate {
        if paging.max_items.is_some() {
            return Err(Error::MaxItemsWithoutPagination);
        }
        let request = PageRequest {
            cursor: paging.start_cursor()?,
            page_size_hint: paging.page_size,
        };
        return Ok(walk_one_page(endpoint, request, bounds).await.into());
    }

    let walker = PageWalker::new(endpoint, paging.walk_config(bounds)?, cancel)?;
    Ok(walker.drain().await.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::{
        AwsResult, Cluster, ClusterParameter, ClusterParameterGroup, ClusterSecurityGroup,
        ClusterSnapshot, ClusterSubnetGroup, Event, HsmClientCertificate, HsmConfiguration,
        Paging, TaggedResource,
    };
    use crate::error::{RemoteCallError, WalkError};
    use crate::page::PageResult;
    use crate::writer::OutputFormat;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use termcolor::Buffer;

    /// Serves `cluster-0 .. cluster-{n}` with numeric markers, and fails any
    /// call whose marker is listed in `fail_at`.
    struct MockRedshift {
        clusters: usize,
        fail_at: Option<String>,
        cluster_calls: Mutex<Vec<DescribeClustersInput>>,
        event_calls: Mutex<Vec<DescribeEventsInput>>,
    }

    impl MockRedshift {
        fn new(clusters: usize) -> Self {
            Self {
                clusters,
                fail_at: None,
                cluster_calls: Mutex::new(Vec::new()),
                event_calls: Mutex::new(Vec::new()),
            }
        }

        fn paging(&self) -> Vec<Paging> {
            self.cluster_calls
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.paging.clone())
                .collect()
        }
    }

    fn cluster(i: usize) -> Cluster {
        Cluster {
            identifier: format!("cluster-{}", i),
            node_type: Some("ra3.xlplus".to_string()),
            status: Some("available".to_string()),
            number_of_nodes: Some(2),
            db_name: Some("dev".to_string()),
            endpoint: None,
            created: None,
        }
    }

    #[async_trait::async_trait]
    impl AwsRedshiftClient for MockRedshift {
        async fn describe_clusters(&self, input: DescribeClustersInput) -> AwsResult<Cluster> {
            self.cluster_calls.lock().unwrap().push(input.clone());
            if input.paging.marker.is_some() && input.paging.marker == self.fail_at {
                return Err(RemoteCallError::Throttling);
            }
            let start: usize = input
                .paging
                .marker
                .as_deref()
                .map(|m| m.parse().unwrap())
                .unwrap_or(0);
            let size = input.paging.max_records.unwrap_or(100) as usize;
            let end = (start + size).min(self.clusters);
            let next = if end < self.clusters {
                Some(end.to_string())
            } else {
                None
            };
            Ok(PageResult::new((start..end).map(cluster).collect(), next))
        }

        async fn describe_cluster_snapshots(
            &self,
            _input: DescribeClusterSnapshotsInput,
        ) -> AwsResult<ClusterSnapshot> {
            Ok(PageResult::last(vec![]))
        }

        async fn describe_cluster_parameter_groups(
            &self,
            _input: DescribeClusterParameterGroupsInput,
        ) -> AwsResult<ClusterParameterGroup> {
            Ok(PageResult::last(vec![]))
        }

        async fn describe_cluster_parameters(
            &self,
            _input: DescribeClusterParametersInput,
        ) -> AwsResult<ClusterParameter> {
            Ok(PageResult::last(vec![]))
        }

        async fn describe_cluster_security_groups(
            &self,
            _input: DescribeClusterSecurityGroupsInput,
        ) -> AwsResult<ClusterSecurityGroup> {
            Ok(PageResult::last(vec![]))
        }

        async fn describe_cluster_subnet_groups(
            &self,
            _input: DescribeClusterSubnetGroupsInput,
        ) -> AwsResult<ClusterSubnetGroup> {
            Ok(PageResult::last(vec![]))
        }

        async fn describe_hsm_client_certificates(
            &self,
            _input: DescribeHsmClientCertificatesInput,
        ) -> AwsResult<HsmClientCertificate> {
            Ok(PageResult::last(vec![]))
        }

        async fn describe_hsm_configurations(
            &self,
            _input: DescribeHsmConfigurationsInput,
        ) -> AwsResult<HsmConfiguration> {
            Ok(PageResult::last(vec![]))
        }

        async fn describe_events(&self, input: DescribeEventsInput) -> AwsResult<Event> {
            self.event_calls.lock().unwrap().push(input);
            Ok(PageResult::last(vec![]))
        }

        async fn describe_tags(&self, _input: DescribeTagsInput) -> AwsResult<TaggedResource> {
            Ok(PageResult::last(vec![]))
        }
    }

    fn clusters_endpoint(client: &MockRedshift) -> Endpoint<'_, MockRedshift, DescribeClustersInput> {
        Endpoint::new(
            client,
            DescribeClustersInput {
                cluster_identifier: Some("cluster-*".to_string()),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn lists_everything_by_default() {
        let client = MockRedshift::new(250);

        let envelope: Envelope<Cluster> = collect(
            &clusters_endpoint(&client),
            &PagingOpts::default(),
            REDSHIFT_PAGE_BOUNDS,
            Cancellation::never(),
        )
        .await
        .unwrap();

        assert!(envelope.is_success());
        assert_eq!(envelope.items().len(), 250);
        let paging = client.paging();
        assert_eq!(paging.len(), 3);
        assert!(paging.iter().all(|p| p.max_records == Some(100)));
        assert_eq!(paging[1].marker.as_deref(), Some("100"));
        assert!(client
            .cluster_calls
            .lock()
            .unwrap()
            .iter()
            .all(|c| c.cluster_identifier.as_deref() == Some("cluster-*")));
    }

    #[tokio::test]
    async fn max_items_stops_early_with_next_token() {
        let client = MockRedshift::new(250);
        let paging = PagingOpts {
            max_items: Some(130),
            ..Default::default()
        };

        let envelope: Envelope<Cluster> = collect(
            &clusters_endpoint(&client),
            &paging,
            REDSHIFT_PAGE_BOUNDS,
            Cancellation::never(),
        )
        .await
        .unwrap();

        assert_eq!(
            client.paging().iter().map(|p| p.max_records).collect::<Vec<_>>(),
            vec![Some(100), Some(30)]
        );
        match envelope {
            Envelope::Items {
                items,
                next_token,
                limit_reached,
            } => {
                assert_eq!(items.len(), 130);
                assert_eq!(next_token, Cursor::new("130"));
                assert!(limit_reached);
            }
            other => panic!("unexpected envelope {:?}", other),
        }
    }

    #[tokio::test]
    async fn cut_last_page_differs_from_a_finished_listing() {
        let capped_client = MockRedshift::new(250);
        let paging = PagingOpts {
            max_items: Some(110),
            ..Default::default()
        };
        let capped: Envelope<Cluster> = collect(
            &clusters_endpoint(&capped_client),
            &paging,
            REDSHIFT_PAGE_BOUNDS,
            Cancellation::never(),
        )
        .await
        .unwrap();

        let finished_client = MockRedshift::new(110);
        let finished: Envelope<Cluster> = collect(
            &clusters_endpoint(&finished_client),
            &PagingOpts::default(),
            REDSHIFT_PAGE_BOUNDS,
            Cancellation::never(),
        )
        .await
        .unwrap();

        assert_eq!(
            capped_client.paging().iter().map(|p| p.max_records).collect::<Vec<_>>(),
            vec![Some(100), Some(20)]
        );
        assert_eq!(
            capped,
            Envelope::Items {
                items: (0..110).map(cluster).collect(),
                next_token: None,
                limit_reached: true,
            }
        );
        assert_eq!(
            finished,
            Envelope::Items {
                items: (0..110).map(cluster).collect(),
                next_token: None,
                limit_reached: false,
            }
        );
    }

    #[tokio::test]
    async fn small_max_items_requests_the_service_minimum() {
        let client = MockRedshift::new(250);
        let paging = PagingOpts {
            max_items: Some(5),
            ..Default::default()
        };

        let envelope: Envelope<Cluster> = collect(
            &clusters_endpoint(&client),
            &paging,
            REDSHIFT_PAGE_BOUNDS,
            Cancellation::never(),
        )
        .await
        .unwrap();

        assert_eq!(client.paging()[0].max_records, Some(20));
        assert_eq!(
            envelope,
            Envelope::Items {
                items: (0..5).map(cluster).collect(),
                next_token: None,
                limit_reached: true,
            }
        );
    }

    #[tokio::test]
    async fn no_paginate_fetches_one_page_from_token() {
        let client = MockRedshift::new(250);
        let paging = PagingOpts {
            starting_token: Some("40".to_string()),
            page_size: Some(25),
            no_paginate: true,
            ..Default::default()
        };

        let envelope: Envelope<Cluster> = collect(
            &clusters_endpoint(&client),
            &paging,
            REDSHIFT_PAGE_BOUNDS,
            Cancellation::never(),
        )
        .await
        .unwrap();

        assert_eq!(
            client.paging(),
            vec![Paging {
                marker: Some("40".to_string()),
                max_records: Some(25),
            }]
        );
        assert_eq!(
            envelope,
            Envelope::Items {
                items: (40..65).map(cluster).collect(),
                next_token: Cursor::new("65"),
                limit_reached: false,
            }
        );
    }

    #[tokio::test]
    async fn failure_mid_walk_is_partial() {
        let mut client = MockRedshift::new(250);
        client.fail_at = Some("100".to_string());

        let envelope: Envelope<Cluster> = collect(
            &clusters_endpoint(&client),
            &PagingOpts::default(),
            REDSHIFT_PAGE_BOUNDS,
            Cancellation::never(),
        )
        .await
        .unwrap();

        assert_eq!(envelope.items().len(), 100);
        match envelope {
            Envelope::Partial { error, .. } => assert_eq!(
                error,
                WalkError::Remote {
                    source: RemoteCallError::Throttling,
                    emitted: 100,
                }
            ),
            other => panic!("unexpected envelope {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_starting_token_is_rejected() {
        let client = MockRedshift::new(10);
        let paging = PagingOpts {
            starting_token: Some(String::new()),
            ..Default::default()
        };

        let result: Result<Envelope<Cluster>, Error> = collect(
            &clusters_endpoint(&client),
            &paging,
            REDSHIFT_PAGE_BOUNDS,
            Cancellation::never(),
        )
        .await;

        assert!(matches!(result, Err(Error::EmptyStartingToken)));
        assert!(client.paging().is_empty());
    }

    #[tokio::test]
    async fn max_items_is_rejected_for_a_single_page() {
        let client = MockRedshift::new(250);
        let paging = PagingOpts {
            max_items: Some(30),
            no_paginate: true,
            ..Default::default()
        };

        let result: Result<Envelope<Cluster>, Error> = collect(
            &clusters_endpoint(&client),
            &paging,
            REDSHIFT_PAGE_BOUNDS,
            Cancellation::never(),
        )
        .await;

        assert!(matches!(result, Err(Error::MaxItemsWithoutPagination)));
        assert!(client.paging().is_empty());
    }

    #[tokio::test]
    async fn zero_max_items_is_rejected() {
        let client = MockRedshift::new(10);
        let paging = PagingOpts {
            max_items: Some(0),
            ..Default::default()
        };

        let result: Result<Envelope<Cluster>, Error> = collect(
            &clusters_endpoint(&client),
            &paging,
            REDSHIFT_PAGE_BOUNDS,
            Cancellation::never(),
        )
        .await;

        assert!(matches!(
            result,
            Err(Error::Incomplete(WalkError::InvalidConfiguration(_)))
        ));
        assert!(client.paging().is_empty());
    }

    #[tokio::test]
    async fn events_map_time_filters() {
        let client = MockRedshift::new(0);
        let mut writer = Writer::new(Buffer::no_color(), OutputFormat::Text);
        let since = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let resource = Resource::Events {
            source_identifier: Some("analytics".to_string()),
            source_type: Some("cluster".to_string()),
            since: Some(since),
            duration: Some(Duration::from_secs(2 * 60 * 60)),
        };

        let ok = list(
            &client,
            resource,
            &PagingOpts::default(),
            Cancellation::never(),
            &mut writer,
        )
        .await
        .unwrap();

        assert!(ok);
        let calls = client.event_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].start_time, Some(since));
        assert_eq!(calls[0].duration_minutes, Some(120));
        assert_eq!(calls[0].source_type.as_deref(), Some("cluster"));
        assert_eq!(calls[0].paging.max_records, Some(100));
    }

    #[tokio::test]
    async fn list_renders_clusters_and_reports_failure() {
        let mut client = MockRedshift::new(150);
        client.fail_at = Some("100".to_string());
        let mut writer = Writer::new(Buffer::no_color(), OutputFormat::Text);

        let ok = list(
            &client,
            Resource::Clusters {
                cluster_identifier: None,
            },
            &PagingOpts::default(),
            Cancellation::never(),
            &mut writer,
        )
        .await
        .unwrap();

        assert!(!ok);
        let out = String::from_utf8(writer.into_inner().into_inner()).unwrap();
        assert!(out.starts_with("cluster-0\tavailable\t"));
        assert!(out.ends_with("error: remote call failed after 100 items (rate limit exceeded)\n"));
    }

    #[test]
    fn subcommands_parse() {
        let resource = Resource::from_iter_safe(vec![
            "rslist",
            "parameters",
            "default.redshift-1.0",
            "--source",
            "user",
        ])
        .unwrap();
        match resource {
            Resource::Parameters {
                parameter_group_name,
                source,
            } => {
                assert_eq!(parameter_group_name, "default.redshift-1.0");
                assert_eq!(source.as_deref(), Some("user"));
            }
            other => panic!("unexpected resource {:?}", other),
        }

        let resource =
            Resource::from_iter_safe(vec!["rslist", "events", "--duration", "90m"]).unwrap();
        match resource {
            Resource::Events { duration, .. } => {
                assert_eq!(duration, Some(Duration::from_secs(90 * 60)))
            }
            other => panic!("unexpected resource {:?}", other),
        }
    }
}
