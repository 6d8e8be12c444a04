mod aws_sdk;

pub use aws_sdk::RedshiftClient;

use crate::error::RemoteCallError;
use crate::page::{PageRequest, PageResult};
use crate::walker::FetchPage;
use chrono::{DateTime, Utc};
use std::convert::TryFrom;

pub type AwsResult<T> = Result<PageResult<T>, RemoteCallError>;

/// Trait representing the paginated list calls of the Redshift control plane
#[async_trait::async_trait]
pub trait AwsRedshiftClient: Send + Sync {
    async fn describe_clusters(&self, input: DescribeClustersInput) -> AwsResult<Cluster>;

    async fn describe_cluster_snapshots(
        &self,
        input: DescribeClusterSnapshotsInput,
    ) -> AwsResult<ClusterSnapshot>;

    async fn describe_cluster_parameter_groups(
        &self,
        input: DescribeClusterParameterGroupsInput,
    ) -> AwsResult<ClusterParameterGroup>;

    async fn describe_cluster_parameters(
        &self,
        input: DescribeClusterParametersInput,
    ) -> AwsResult<ClusterParameter>;

    async fn describe_cluster_security_groups(
        &self,
        input: DescribeClusterSecurityGroupsInput,
    ) -> AwsResult<ClusterSecurityGroup>;

    async fn describe_cluster_subnet_groups(
        &self,
        input: DescribeClusterSubnetGroupsInput,
    ) -> AwsResult<ClusterSubnetGroup>;

    async fn describe_hsm_client_certificates(
        &self,
        input: DescribeHsmClientCertificatesInput,
    ) -> AwsResult<HsmClientCertificate>;

    async fn describe_hsm_configurations(
        &self,
        input: DescribeHsmConfigurationsInput,
    ) -> AwsResult<HsmConfiguration>;

    async fn describe_events(&self, input: DescribeEventsInput) -> AwsResult<Event>;

    async fn describe_tags(&self, input: DescribeTagsInput) -> AwsResult<TaggedResource>;
}

/// The `Marker` / `MaxRecords` pair every list call accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paging {
    pub marker: Option<String>,
    pub max_records: Option<i32>,
}

impl From<PageRequest> for Paging {
    fn from(request: PageRequest) -> Self {
        Self {
            marker: request.cursor.map(|c| c.into_string()),
            max_records: request
                .page_size_hint
                .map(|size| i32::try_from(size).unwrap_or(i32::MAX)),
        }
    }
}

/// List inputs onto which the walker overlays its cursor and page size.
pub trait Paged: Clone + Send + Sync {
    fn paging_mut(&mut self) -> &mut Paging;

    fn with_page(mut self, request: PageRequest) -> Self {
        *self.paging_mut() = Paging::from(request);
        self
    }
}

macro_rules! paged {
    ($($input:ty),+ $(,)?) => {
        $(
            impl Paged for $input {
                fn paging_mut(&mut self) -> &mut Paging {
                    &mut self.paging
                }
            }
        )+
    };
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeClustersInput {
    pub cluster_identifier: Option<String>,
    pub paging: Paging,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeClusterSnapshotsInput {
    pub cluster_identifier: Option<String>,
    pub snapshot_identifier: Option<String>,
    pub snapshot_type: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub paging: Paging,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeClusterParameterGroupsInput {
    pub parameter_group_name: Option<String>,
    pub paging: Paging,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeClusterParametersInput {
    pub parameter_group_name: String,
    pub source: Option<String>,
    pub paging: Paging,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeClusterSecurityGroupsInput {
    pub cluster_security_group_name: Option<String>,
    pub paging: Paging,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeClusterSubnetGroupsInput {
    pub cluster_subnet_group_name: Option<String>,
    pub paging: Paging,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeHsmClientCertificatesInput {
    pub hsm_client_certificate_identifier: Option<String>,
    pub paging: Paging,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeHsmConfigurationsInput {
    pub hsm_configuration_identifier: Option<String>,
    pub paging: Paging,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeEventsInput {
    pub source_identifier: Option<String>,
    pub source_type: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub paging: Paging,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeTagsInput {
    pub resource_name: Option<String>,
    pub resource_type: Option<String>,
    pub paging: Paging,
}

paged!(
    DescribeClustersInput,
    DescribeClusterSnapshotsInput,
    DescribeClusterParameterGroupsInput,
    DescribeClusterParametersInput,
    DescribeClusterSecurityGroupsInput,
    DescribeClusterSubnetGroupsInput,
    DescribeHsmClientCertificatesInput,
    DescribeHsmConfigurationsInput,
    DescribeEventsInput,
    DescribeTagsInput,
);

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub identifier: String,
    pub node_type: Option<String>,
    pub status: Option<String>,
    pub number_of_nodes: Option<i32>,
    pub db_name: Option<String>,
    pub endpoint: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSnapshot {
    pub identifier: String,
    pub cluster_identifier: Option<String>,
    pub snapshot_type: Option<String>,
    pub status: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParameterGroup {
    pub name: String,
    pub family: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParameter {
    pub name: String,
    pub value: Option<String>,
    pub source: Option<String>,
    pub apply_type: Option<String>,
    pub is_modifiable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSecurityGroup {
    pub name: String,
    pub description: Option<String>,
    pub ec2_security_groups: usize,
    pub ip_ranges: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSubnetGroup {
    pub name: String,
    pub vpc_id: Option<String>,
    pub status: Option<String>,
    pub subnets: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HsmClientCertificate {
    pub identifier: String,
    pub has_public_key: bool,
    pub tags: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HsmConfiguration {
    pub identifier: String,
    pub ip_address: Option<String>,
    pub partition_name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub date: Option<DateTime<Utc>>,
    pub source_identifier: Option<String>,
    pub source_type: Option<String>,
    pub severity: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaggedResource {
    pub resource_name: Option<String>,
    pub resource_type: Option<String>,
    pub key: Option<String>,
    pub value: Option<String>,
}

/// One list operation bound to a client and a set of filters.
pub struct Endpoint<'a, C: ?Sized, I> {
    client: &'a C,
    input: I,
}

impl<'a, C: ?Sized, I> Endpoint<'a, C, I> {
    pub fn new(client: &'a C, input: I) -> Self {
        Self { client, input }
    }
}

macro_rules! endpoint {
    ($input:ty => $record:ty, $method:ident) => {
        #[async_trait::async_trait]
        impl<'a, C> FetchPage<$record> for Endpoint<'a, C, $input>
        where
            C: AwsRedshiftClient + ?Sized,
        {
            async fn fetch_page(&self, request: PageRequest) -> AwsResult<$record> {
                self.client.$method(self.input.clone().with_page(request)).await
            }
        }
    };
}

endpoint!(DescribeClustersInput => Cluster, describe_clusters);
endpoint!(DescribeClusterSnapshotsInput => ClusterSnapshot, describe_cluster_snapshots);
endpoint!(DescribeClusterParameterGroupsInput => ClusterParameterGroup, describe_cluster_parameter_groups);
endpoint!(DescribeClusterParametersInput => ClusterParameter, describe_cluster_parameters);
endpoint!(DescribeClusterSecurityGroupsInput => ClusterSecurityGroup, describe_cluster_security_groups);
endpoint!(DescribeClusterSubnetGroupsInput => ClusterSubnetGroup, describe_cluster_subnet_groups);
endpoint!(DescribeHsmClientCertificatesInput => HsmClientCertificate, describe_hsm_client_certificates);
endpoint!(DescribeHsmConfigurationsInput => HsmConfiguration, describe_hsm_configurations);
endpoint!(DescribeEventsInput => Event, describe_events);
endpoint!(DescribeTagsInput => TaggedResource, describe_tags);
