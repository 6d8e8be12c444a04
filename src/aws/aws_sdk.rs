use super::{
    AwsRedshiftClient, AwsResult, Cluster, ClusterParameter, ClusterParameterGroup,
    ClusterSecurityGroup, ClusterSnapshot, ClusterSubnetGroup, DescribeClusterParameterGroupsInput,
    DescribeClusterParametersInput, DescribeClusterSecurityGroupsInput,
    DescribeClusterSnapshotsInput, DescribeClusterSubnetGroupsInput, DescribeClustersInput,
    DescribeEventsInput, DescribeHsmClientCertificatesInput, DescribeHsmConfigurationsInput,
    DescribeTagsInput, Event, HsmClientCertificate, HsmConfiguration, TaggedResource,
};
use crate::error::{ErrorResponse, RemoteCallError};
use crate::page::PageResult;

use aws_credential_types::provider::error::CredentialsError;
use aws_sdk_redshift::config::http::HttpResponse;
use aws_sdk_redshift::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_redshift::types::SourceType;
use aws_sdk_redshift::Client;
use aws_smithy_types_convert::date_time::DateTimeExt;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;
use tracing::Instrument;

macro_rules! send_request_with_retry {
    ($self:ident, $name:literal, $builder:ident) => {{
        let name = $name;
        let builder = $builder;
        backoff::future::retry(crate::exponential_backoff::policy($self.max_retry_time), move || {
            let builder = builder.clone();
            // transient failures are retried until the policy gives up, anything
            // else fails the call straight away
            async move {
                builder.send().await.map_err(|e| {
                    let err = classify(e);
                    if err.is_transient() {
                        tracing::trace!(%name, err = %err, "transient error, retrying");
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        })
        .instrument(tracing::debug_span!("sending request", %name))
        .await
    }};
}

/// Redshift control plane client with bounded retries.
pub struct RedshiftClient {
    inner: Client,
    max_retry_time: Duration,
}

impl RedshiftClient {
    pub fn new(inner: Client, max_retry_time: Duration) -> Self {
        Self {
            inner,
            max_retry_time,
        }
    }
}

impl Debug for RedshiftClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RedshiftClient")
    }
}

fn classify<E>(e: SdkError<E, HttpResponse>) -> RemoteCallError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &e {
        SdkError::TimeoutError(_) => RemoteCallError::Timeout,
        SdkError::DispatchFailure(failure) if failure.is_timeout() => RemoteCallError::Timeout,
        SdkError::DispatchFailure(_) if caused_by_credentials(&e) => RemoteCallError::NoCredentials,
        SdkError::DispatchFailure(_) => RemoteCallError::Dispatch(DisplayErrorContext(&e).to_string()),
        SdkError::ServiceError(_) => match e.code() {
            Some(code) => RemoteCallError::from_code(code, e.message().unwrap_or_default()),
            None => RemoteCallError::Unknown(DisplayErrorContext(&e).to_string()),
        },
        SdkError::ResponseError(context) => {
            // the sdk could not make sense of the body; it is usually still an
            // AWS error document
            context
                .raw()
                .body()
                .bytes()
                .and_then(|body| std::str::from_utf8(body).ok())
                .and_then(|body| ErrorResponse::from_str(body).ok())
                .map(RemoteCallError::from)
                .unwrap_or_else(|| RemoteCallError::Response(DisplayErrorContext(&e).to_string()))
        }
        SdkError::ConstructionFailure(_) => {
            RemoteCallError::Unknown("construction failure".to_string())
        }
        _ => RemoteCallError::Unknown(DisplayErrorContext(&e).to_string()),
    }
}

/// Identity resolution failures reach us as dispatch failures wrapping the
/// provider's `CredentialsError`.
fn caused_by_credentials(e: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = Some(e);
    while let Some(err) = source {
        if err.downcast_ref::<CredentialsError>().is_some() {
            return true;
        }
        source = err.source();
    }
    false
}

fn to_chrono(dt: Option<&aws_smithy_types::DateTime>) -> Option<DateTime<Utc>> {
    dt.and_then(|dt| dt.to_chrono_utc().ok())
}

fn from_chrono(dt: Option<DateTime<Utc>>) -> Option<aws_smithy_types::DateTime> {
    dt.map(|dt| aws_smithy_types::DateTime::from_secs(dt.timestamp()))
}

fn owned(s: Option<&str>) -> Option<String> {
    s.map(str::to_owned)
}

#[async_trait::async_trait]
impl AwsRedshiftClient for RedshiftClient {
    async fn describe_clusters(&self, input: DescribeClustersInput) -> AwsResult<Cluster> {
        let builder = self
            .inner
            .describe_clusters()
            .set_cluster_identifier(input.cluster_identifier)
            .set_marker(input.paging.marker)
            .set_max_records(input.paging.max_records);
        let output = send_request_with_retry!(self, "describe_clusters", builder)?;
        Ok(PageResult::new(
            output.clusters().iter().map(From::from).collect(),
            owned(output.marker()),
        ))
    }

    async fn describe_cluster_snapshots(
        &self,
        input: DescribeClusterSnapshotsInput,
    ) -> AwsResult<ClusterSnapshot> {
        let builder = self
            .inner
            .describe_cluster_snapshots()
            .set_cluster_identifier(input.cluster_identifier)
            .set_snapshot_identifier(input.snapshot_identifier)
            .set_snapshot_type(input.snapshot_type)
            .set_start_time(from_chrono(input.start_time))
            .set_marker(input.paging.marker)
            .set_max_records(input.paging.max_records);
        let output = send_request_with_retry!(self, "describe_cluster_snapshots", builder)?;
        Ok(PageResult::new(
            output.snapshots().iter().map(From::from).collect(),
            owned(output.marker()),
        ))
    }

    async fn describe_cluster_parameter_groups(
        &self,
        input: DescribeClusterParameterGroupsInput,
    ) -> AwsResult<ClusterParameterGroup> {
        let builder = self
            .inner
            .describe_cluster_parameter_groups()
            .set_parameter_group_name(input.parameter_group_name)
            .set_marker(input.paging.marker)
            .set_max_records(input.paging.max_records);
        let output = send_request_with_retry!(self, "describe_cluster_parameter_groups", builder)?;
        Ok(PageResult::new(
            output.parameter_groups().iter().map(From::from).collect(),
            owned(output.marker()),
        ))
    }

    async fn describe_cluster_parameters(
        &self,
        input: DescribeClusterParametersInput,
    ) -> AwsResult<ClusterParameter> {
        let builder = self
            .inner
            .describe_cluster_parameters()
            .parameter_group_name(input.parameter_group_name)
            .set_source(input.source)
            .set_marker(input.paging.marker)
            .set_max_records(input.paging.max_records);
        let output = send_request_with_retry!(self, "describe_cluster_parameters", builder)?;
        Ok(PageResult::new(
            output.parameters().iter().map(From::from).collect(),
            owned(output.marker()),
        ))
    }

    async fn describe_cluster_security_groups(
        &self,
        input: DescribeClusterSecurityGroupsInput,
    ) -> AwsResult<ClusterSecurityGroup> {
        let builder = self
            .inner
            .describe_cluster_security_groups()
            .set_cluster_security_group_name(input.cluster_security_group_name)
            .set_marker(input.paging.marker)
            .set_max_records(input.paging.max_records);
        let output = send_request_with_retry!(self, "describe_cluster_security_groups", builder)?;
        Ok(PageResult::new(
            output
                .cluster_security_groups()
                .iter()
                .map(From::from)
                .collect(),
            owned(output.marker()),
        ))
    }

    async fn describe_cluster_subnet_groups(
        &self,
        input: DescribeClusterSubnetGroupsInput,
    ) -> AwsResult<ClusterSubnetGroup> {
        let builder = self
            .inner
            .describe_cluster_subnet_groups()
            .set_cluster_subnet_group_name(input.cluster_subnet_group_name)
            .set_marker(input.paging.marker)
            .set_max_records(input.paging.max_records);
        let output = send_request_with_retry!(self, "describe_cluster_subnet_groups", builder)?;
        Ok(PageResult::new(
            output
                .cluster_subnet_groups()
                .iter()
                .map(From::from)
                .collect(),
            owned(output.marker()),
        ))
    }

    async fn describe_hsm_client_certificates(
        &self,
        input: DescribeHsmClientCertificatesInput,
    ) -> AwsResult<HsmClientCertificate> {
        let builder = self
            .inner
            .describe_hsm_client_certificates()
            .set_hsm_client_certificate_identifier(input.hsm_client_certificate_identifier)
            .set_marker(input.paging.marker)
            .set_max_records(input.paging.max_records);
        let output = send_request_with_retry!(self, "describe_hsm_client_certificates", builder)?;
        Ok(PageResult::new(
            output
                .hsm_client_certificates()
                .iter()
                .map(From::from)
                .collect(),
            owned(output.marker()),
        ))
    }

    async fn describe_hsm_configurations(
        &self,
        input: DescribeHsmConfigurationsInput,
    ) -> AwsResult<HsmConfiguration> {
        let builder = self
            .inner
            .describe_hsm_configurations()
            .set_hsm_configuration_identifier(input.hsm_configuration_identifier)
            .set_marker(input.paging.marker)
            .set_max_records(input.paging.max_records);
        let output = send_request_with_retry!(self, "describe_hsm_configurations", builder)?;
        Ok(PageResult::new(
            output.hsm_configurations().iter().map(From::from).collect(),
            owned(output.marker()),
        ))
    }

    async fn describe_events(&self, input: DescribeEventsInput) -> AwsResult<Event> {
        let builder = self
            .inner
            .describe_events()
            .set_source_identifier(input.source_identifier)
            .set_source_type(input.source_type.as_deref().map(SourceType::from))
            .set_start_time(from_chrono(input.start_time))
            .set_duration(input.duration_minutes)
            .set_marker(input.paging.marker)
            .set_max_records(input.paging.max_records);
        let output = send_request_with_retry!(self, "describe_events", builder)?;
        Ok(PageResult::new(
            output.events().iter().map(From::from).collect(),
            owned(output.marker()),
        ))
    }

    async fn describe_tags(&self, input: DescribeTagsInput) -> AwsResult<TaggedResource> {
        let builder = self
            .inner
            .describe_tags()
            .set_resource_name(input.resource_name)
            .set_resource_type(input.resource_type)
            .set_marker(input.paging.marker)
            .set_max_records(input.paging.max_records);
        let output = send_request_with_retry!(self, "describe_tags", builder)?;
        Ok(PageResult::new(
            output.tagged_resources().iter().map(From::from).collect(),
            owned(output.marker()),
        ))
    }
}

// conversions from sdk types

impl From<&aws_sdk_redshift::types::Cluster> for Cluster {
    fn from(c: &aws_sdk_redshift::types::Cluster) -> Self {
        Self {
            identifier: c.cluster_identifier().unwrap_or_default().to_string(),
            node_type: owned(c.node_type()),
            status: owned(c.cluster_status()),
            number_of_nodes: c.number_of_nodes(),
            db_name: owned(c.db_name()),
            endpoint: c.endpoint().and_then(|e| {
                e.address().map(|address| match e.port() {
                    Some(port) => format!("{}:{}", address, port),
                    None => address.to_string(),
                })
            }),
            created: to_chrono(c.cluster_create_time()),
        }
    }
}

impl From<&aws_sdk_redshift::types::Snapshot> for ClusterSnapshot {
    fn from(s: &aws_sdk_redshift::types::Snapshot) -> Self {
        Self {
            identifier: s.snapshot_identifier().unwrap_or_default().to_string(),
            cluster_identifier: owned(s.cluster_identifier()),
            snapshot_type: owned(s.snapshot_type()),
            status: owned(s.status()),
            created: to_chrono(s.snapshot_create_time()),
        }
    }
}

impl From<&aws_sdk_redshift::types::ClusterParameterGroup> for ClusterParameterGroup {
    fn from(g: &aws_sdk_redshift::types::ClusterParameterGroup) -> Self {
        Self {
            name: g.parameter_group_name().unwrap_or_default().to_string(),
            family: owned(g.parameter_group_family()),
            description: owned(g.description()),
        }
    }
}

impl From<&aws_sdk_redshift::types::Parameter> for ClusterParameter {
    fn from(p: &aws_sdk_redshift::types::Parameter) -> Self {
        Self {
            name: p.parameter_name().unwrap_or_default().to_string(),
            value: owned(p.parameter_value()),
            source: owned(p.source()),
            apply_type: p.apply_type().map(|t| t.as_str().to_owned()),
            is_modifiable: p.is_modifiable(),
        }
    }
}

impl From<&aws_sdk_redshift::types::ClusterSecurityGroup> for ClusterSecurityGroup {
    fn from(g: &aws_sdk_redshift::types::ClusterSecurityGroup) -> Self {
        Self {
            name: g.cluster_security_group_name().unwrap_or_default().to_string(),
            description: owned(g.description()),
            ec2_security_groups: g.ec2_security_groups().len(),
            ip_ranges: g.ip_ranges().len(),
        }
    }
}

impl From<&aws_sdk_redshift::types::ClusterSubnetGroup> for ClusterSubnetGroup {
    fn from(g: &aws_sdk_redshift::types::ClusterSubnetGroup) -> Self {
        Self {
            name: g.cluster_subnet_group_name().unwrap_or_default().to_string(),
            vpc_id: owned(g.vpc_id()),
            status: owned(g.subnet_group_status()),
            subnets: g.subnets().len(),
        }
    }
}

impl From<&aws_sdk_redshift::types::HsmClientCertificate> for HsmClientCertificate {
    fn from(c: &aws_sdk_redshift::types::HsmClientCertificate) -> Self {
        Self {
            identifier: c
                .hsm_client_certificate_identifier()
                .unwrap_or_default()
                .to_string(),
            has_public_key: c.hsm_client_certificate_public_key().is_some(),
            tags: c.tags().len(),
        }
    }
}

impl From<&aws_sdk_redshift::types::HsmConfiguration> for HsmConfiguration {
    fn from(c: &aws_sdk_redshift::types::HsmConfiguration) -> Self {
        Self {
            identifier: c.hsm_configuration_identifier().unwrap_or_default().to_string(),
            ip_address: owned(c.hsm_ip_address()),
            partition_name: owned(c.hsm_partition_name()),
            description: owned(c.description()),
        }
    }
}

impl From<&aws_sdk_redshift::types::Event> for Event {
    fn from(e: &aws_sdk_redshift::types::Event) -> Self {
        Self {
            date: to_chrono(e.date()),
            source_identifier: owned(e.source_identifier()),
            source_type: e.source_type().map(|t| t.as_str().to_owned()),
            severity: owned(e.severity()),
            message: owned(e.message()),
        }
    }
}

impl From<&aws_sdk_redshift::types::TaggedResource> for TaggedResource {
    fn from(r: &aws_sdk_redshift::types::TaggedResource) -> Self {
        Self {
            resource_name: owned(r.resource_name()),
            resource_type: owned(r.resource_type()),
            key: r.tag().and_then(|t| owned(t.key())),
            value: r.tag().and_then(|t| owned(t.value())),
        }
    }
}
