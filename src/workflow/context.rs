use crate::api::OnboardingClient;
use crate::cli::{PlacementArgs, RootArgs};
use crate::config::{load_client_config, ClientConfig};
use crate::model::PlacementParams;
use crate::transport::HttpTransport;
use anyhow::Result;
use std::sync::Arc;

pub(crate) type HttpClient = OnboardingClient<HttpTransport>;

/// Resolved config plus the shared API client for one invocation.
pub(crate) struct DeployContext {
    pub(crate) config: ClientConfig,
    pub(crate) client: Arc<HttpClient>,
    pub(crate) json: bool,
}

impl DeployContext {
    pub(crate) fn load(args: &RootArgs) -> Result<Self> {
        let config = load_client_config(&args.config_overrides())?;
        let client = Arc::new(OnboardingClient::new(HttpTransport::from_config(&config)));
        Ok(Self {
            config,
            client,
            json: args.json,
        })
    }

    pub(crate) fn actor(&self) -> &str {
        &self.config.actor
    }

    /// Merge placement flags over the configured defaults.
    pub(crate) fn placement(&self, args: &PlacementArgs) -> PlacementParams {
        PlacementParams {
            name_prefix: args
                .name_prefix
                .clone()
                .unwrap_or_else(|| self.config.name_prefix.clone()),
            region: args
                .region
                .clone()
                .unwrap_or_else(|| self.config.region.clone()),
            environment: args
                .environment
                .clone()
                .unwrap_or_else(|| self.config.environment.clone()),
            enable_apim: args.enable_apim,
            backend_app_hostname: args.backend_app_hostname.clone(),
            cloud: args.cloud.clone(),
            warehouse: args.warehouse.clone(),
            etl: args.etl.clone(),
            governance: args.governance.clone(),
            enable_bi: args.enable_bi,
            bi_tool: args.bi_tool.clone(),
            allow_costly_resources: args.allow_costly_resources,
        }
    }
}
