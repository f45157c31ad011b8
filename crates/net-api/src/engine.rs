//! Request dispatch

use std::path::Path;
use std::sync::Arc;

use log::{debug, error, info};

use netplan_apply::{
    ApplyOrchestrator, CommandRunner, LinkTeardown, NetplanCli, StatusMap, StatusProbe,
    SystemCommandRunner, Warning,
};
use netplan_config::{EngineSettings, NetplanStore};
use netplan_core::{
    BondConfig, BridgeConfig, ConstructKind, LinkState, NetplanFile, PersistenceError, Result,
    StaticAddress, VlanConfig,
};
use netplan_validate::{ConflictReport, NetworkValidator};

use crate::request::{
    Action, AddBondRequest, AddBridgeRequest, AddVlanRequest, DeleteRequest, Request,
    SetIpRequest, SetMtuRequest, SetStateRequest, TimeoutRequest,
};
use crate::response::Response;

/// Decoded edit of a mutating action
enum Edit {
    AddBond(BondConfig),
    AddVlan(VlanConfig),
    AddBridge(BridgeConfig),
    Delete {
        kind: ConstructKind,
        name: String,
    },
    SetIp {
        name: String,
        kind: Option<ConstructKind>,
        address: StaticAddress,
    },
    SetMtu {
        name: String,
        kind: Option<ConstructKind>,
        mtu: i64,
    },
    SetState {
        name: String,
        kind: Option<ConstructKind>,
        state: LinkState,
    },
}

/// Entry point for every request
pub struct Engine {
    settings: EngineSettings,
    store: Arc<NetplanStore>,
    orchestrator: ApplyOrchestrator,
    teardown: LinkTeardown,
    probe: StatusProbe,
    validator: NetworkValidator,
}

impl Engine {
    /// Engine running the real system tools
    pub fn bootstrap(settings: EngineSettings) -> Self {
        Self::with_runner(settings, Arc::new(SystemCommandRunner::new()))
    }

    /// Engine running external commands through `runner`
    pub fn with_runner(settings: EngineSettings, runner: Arc<dyn CommandRunner>) -> Self {
        let store = Arc::new(NetplanStore::new(&settings));
        let timeout = settings.command_timeout();

        let cli = NetplanCli::new(runner.clone(), settings.netplan_binary.as_str(), timeout);
        let orchestrator = ApplyOrchestrator::new(&settings, store.clone(), cli);
        let teardown = LinkTeardown::new(runner.clone(), settings.ip_binary.as_str(), timeout);
        let probe = StatusProbe::new(runner, settings.status_binary.as_str(), timeout);

        Self {
            settings,
            store,
            orchestrator,
            teardown,
            probe,
            validator: NetworkValidator::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Handle raw JSON input
    pub async fn handle_json(&self, input: &str) -> Response {
        match Request::parse(input) {
            Ok(request) => self.handle(&request).await,
            Err(e) => {
                error!("Rejected request: {}", e);
                Response::from_error(&e)
            }
        }
    }

    /// Handle one request; every failure becomes a response
    pub async fn handle(&self, request: &Request) -> Response {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                error!("{} failed: {}", request.action.as_deref().unwrap_or("request"), e);
                Response::from_error(&e)
            }
        }
    }

    /// Render the current document as YAML
    pub async fn show(&self) -> Result<String> {
        NetplanStore::render(&self.store.load().await?)
    }

    pub async fn status(&self) -> StatusMap {
        self.probe.probe().await
    }

    /// Dry conflict check of a document file, or the managed one
    pub async fn preview(&self, file: Option<&Path>) -> Result<ConflictReport> {
        let document = match file {
            Some(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|source| {
                    PersistenceError::Read {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                self.store.parse(path, &content)?
            }
            None => self.store.load().await?,
        };
        Ok(self.validator.preview(&document))
    }

    async fn dispatch(&self, request: &Request) -> Result<Response> {
        let action = request.action()?;
        if action.is_mutating() {
            info!("Handling {}, managed document will be reconciled", action);
        } else {
            info!("Handling {}", action);
        }
        debug!("{} config: {}", action, request.config);

        match action {
            Action::Load => {
                let network = self.store.load().await?;
                Ok(Response::ok().with_config(NetplanFile { network }))
            }
            Action::GetStatus => Ok(Response::ok().with_status(self.probe.probe().await)),
            Action::TryConfig => {
                let timeout = request
                    .config::<TimeoutRequest>()?
                    .seconds(self.settings.trial_timeout_secs)?;
                let mut document = self.store.load().await?;
                let report = self.orchestrator.reconcile(&mut document, timeout).await?;
                Ok(Response::ok()
                    .with_result(Response::trial_result(report.trial))
                    .with_report(report))
            }
            Action::ApplyConfig => {
                let timeout = request
                    .config::<TimeoutRequest>()?
                    .seconds(self.settings.trial_timeout_secs)?;
                let report = self.orchestrator.activate(timeout).await?;
                Ok(Response::ok().with_result("apply_success").with_report(report))
            }
            Action::AddBond => {
                let config = request.config::<AddBondRequest>()?.into_config()?;
                self.mutate(action, Edit::AddBond(config)).await
            }
            Action::AddVlan => {
                let config = request.config::<AddVlanRequest>()?.into_config()?;
                self.mutate(action, Edit::AddVlan(config)).await
            }
            Action::AddBridge => {
                let config = request.config::<AddBridgeRequest>()?.into_config()?;
                self.mutate(action, Edit::AddBridge(config)).await
            }
            Action::Delete => {
                let (kind, name) = request.config::<DeleteRequest>()?.target()?;
                self.mutate(action, Edit::Delete { kind, name }).await
            }
            Action::SetIp => {
                let (name, kind, address) = request.config::<SetIpRequest>()?.target()?;
                self.mutate(action, Edit::SetIp { name, kind, address }).await
            }
            Action::SetMtu => {
                let (name, kind, mtu) = request.config::<SetMtuRequest>()?.target()?;
                self.mutate(action, Edit::SetMtu { name, kind, mtu }).await
            }
            Action::SetInterfaceState => {
                let (name, kind, state) = request.config::<SetStateRequest>()?.target()?;
                self.mutate(action, Edit::SetState { name, kind, state }).await
            }
        }
    }

    /// Edit the document, then reconcile it
    async fn mutate(&self, action: Action, edit: Edit) -> Result<Response> {
        let mut document = self.store.load().await?;
        document.ensure_root(self.store.renderer());
        let mut removed = None;

        match edit {
            Edit::AddBond(config) => document.add_bond(&config)?,
            Edit::AddVlan(config) => document.add_vlan(&config)?,
            Edit::AddBridge(config) => document.add_bridge(&config)?,
            Edit::Delete { kind, name } => {
                let stored = document.remove(kind, &name)?;
                info!("Removed {}/{}", kind.section(), stored);
                removed = Some((kind, stored));
            }
            Edit::SetIp {
                name,
                kind,
                address,
            } => {
                document.set_ip(&name, kind, &address)?;
            }
            Edit::SetMtu { name, kind, mtu } => {
                document.set_mtu(&name, kind, mtu)?;
            }
            Edit::SetState { name, kind, state } => {
                document.set_state(&name, kind, state)?;
            }
        }

        match self
            .orchestrator
            .reconcile(&mut document, self.settings.trial_timeout_secs)
            .await
        {
            Ok(report) => {
                // Links go down only once the document without them is live
                let warnings: Vec<Warning> = match removed {
                    Some((kind, stored)) => self.teardown.teardown(kind, &stored).await,
                    None => Vec::new(),
                };
                Ok(Response::ok().with_warnings(&warnings).with_report(report))
            }
            Err(e) => {
                error!("{} failed: {}", action, e);
                Ok(Response::from_error(&e))
            }
        }
    }
}
