use std::{
    fmt::Display,
    io::{BufRead, Write},
    time::Duration,
};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use kube::api::PatchParams;
use log::{info, warn};
use serde_json::Value;

use super::{planner::plan_control_plane_patch, prompt::Prompter, target::ClientPair};
use crate::{
    kubernetes::{
        operations::{merge_patch_resource, try_get_resource},
        patch::is_empty_patch,
        wait::await_condition_indefinitely,
    },
    resources::{cpms::ControlPlaneMachineSet, provider_spec::CloudProvider},
    CONTROL_PLANE_MACHINE_SET_NAME, FIELD_MANAGER, MACHINE_API_NAMESPACE,
};

pub const CONTROL_PLANE_POLL_INTERVAL: Duration = Duration::from_secs(180);

#[async_trait]
pub trait ControlPlaneApi: Send + Sync {
    async fn get_machine_set(&self) -> anyhow::Result<ControlPlaneMachineSet>;
    async fn patch_machine_set(&self, patch: &Value) -> anyhow::Result<()>;
}

pub struct KubeControlPlane {
    clients: ClientPair,
}

impl KubeControlPlane {
    pub fn new(clients: ClientPair) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl ControlPlaneApi for KubeControlPlane {
    async fn get_machine_set(&self) -> anyhow::Result<ControlPlaneMachineSet> {
        try_get_resource::<ControlPlaneMachineSet>(
            &self.clients.standard,
            CONTROL_PLANE_MACHINE_SET_NAME,
            MACHINE_API_NAMESPACE,
        )
        .await?
        .ok_or_else(|| {
            anyhow!(
                "ControlPlaneMachineSet '{MACHINE_API_NAMESPACE}/{CONTROL_PLANE_MACHINE_SET_NAME}' doesn't exist!"
            )
        })
    }

    async fn patch_machine_set(&self, patch: &Value) -> anyhow::Result<()> {
        let patch_params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_owned()),
            ..Default::default()
        };

        merge_patch_resource::<ControlPlaneMachineSet>(
            &self.clients.elevated,
            CONTROL_PLANE_MACHINE_SET_NAME,
            MACHINE_API_NAMESPACE,
            patch,
            &patch_params,
        )
        .await?;

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPlanePhase {
    Idle,
    Validating,
    Patching,
    Progressing,
    Quiesced,
    Aborted,
}

impl Display for ControlPlanePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ControlPlanePhase::Idle => "idle",
            ControlPlanePhase::Validating => "validating",
            ControlPlanePhase::Patching => "patching",
            ControlPlanePhase::Progressing => "progressing",
            ControlPlanePhase::Quiesced => "quiesced",
            ControlPlanePhase::Aborted => "aborted",
        };

        f.write_str(name)
    }
}

pub struct ControlPlaneDriver<'a, A> {
    api: &'a A,
    provider: CloudProvider,
    machine_type: &'a str,
    poll_interval: Duration,
    phase: ControlPlanePhase,
}

impl<'a, A: ControlPlaneApi> ControlPlaneDriver<'a, A> {
    pub fn new(api: &'a A, provider: CloudProvider, machine_type: &'a str) -> Self {
        Self {
            api,
            provider,
            machine_type,
            poll_interval: CONTROL_PLANE_POLL_INTERVAL,
            phase: ControlPlanePhase::Idle,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;

        self
    }

    pub fn phase(&self) -> ControlPlanePhase {
        self.phase
    }

    fn enter(&mut self, phase: ControlPlanePhase) {
        info!("Control plane resize: {} -> {phase}", self.phase);

        self.phase = phase;
    }

    /// Ends in [`ControlPlanePhase::Quiesced`], or [`ControlPlanePhase::Aborted`] when the operator
    /// declines or a step fails.
    pub async fn run<R: BufRead, W: Write>(
        &mut self,
        prompter: &mut Prompter<R, W>,
    ) -> anyhow::Result<ControlPlanePhase> {
        match self.drive(prompter).await {
            Ok(phase) => Ok(phase),
            Err(error) => {
                let failed_in = self.phase;
                self.enter(ControlPlanePhase::Aborted);

                Err(error.context(format!("Control plane resize failed while {failed_in}!")))
            }
        }
    }

    async fn drive<R: BufRead, W: Write>(
        &mut self,
        prompter: &mut Prompter<R, W>,
    ) -> anyhow::Result<ControlPlanePhase> {
        self.enter(ControlPlanePhase::Validating);

        let cpms = self.api.get_machine_set().await?;
        if !cpms.is_active() {
            let state = cpms
                .spec
                .state
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unset".to_owned());

            return Err(anyhow!(
                "ControlPlaneMachineSet is '{state}', it must be Active to resize control plane nodes!"
            ));
        }

        self.enter(ControlPlanePhase::Patching);

        let plan = plan_control_plane_patch(&cpms, self.provider, self.machine_type)?;
        let needs_patch = !is_empty_patch(&plan.patch);

        if needs_patch {
            let question = format!(
                "Resize control plane nodes from '{}' to '{}'?",
                plan.current_instance_type, plan.target_instance_type
            );

            if !prompter.confirm(&question)? {
                warn!("Control plane resize aborted, nothing was changed.");
                self.enter(ControlPlanePhase::Aborted);

                return Ok(self.phase);
            }

            self.api
                .patch_machine_set(&plan.patch)
                .await
                .context("Couldn't patch the ControlPlaneMachineSet!")?;

            info!(
                "ControlPlaneMachineSet now requests '{}' instances.",
                plan.target_instance_type
            );
        } else {
            info!(
                "ControlPlaneMachineSet already requests '{}' instances, skipping the patch.",
                plan.target_instance_type
            );
        }

        self.enter(ControlPlanePhase::Progressing);

        info!(
            "Waiting for control plane machines to be replaced, checking every {}s...",
            self.poll_interval.as_secs()
        );

        let api = self.api;

        await_condition_indefinitely(
            self.poll_interval,
            "control plane machines to be replaced",
            || async move {
                let cpms = api.get_machine_set().await?;
                let progressing = cpms.is_progressing();

                if progressing != Some(false) {
                    info!("Control plane is still being updated...");
                }

                Ok(progressing == Some(false))
            },
        )
        .await;

        self.enter(ControlPlanePhase::Quiesced);

        Ok(self.phase)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::Cursor,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::Value;

    use super::{ControlPlaneApi, ControlPlaneDriver, ControlPlanePhase};
    use serde_json::json;

    use crate::resources::{
        cpms::ControlPlaneMachineSet,
        fixtures::{aws_provider_spec, control_plane_machine_set, gcp_provider_spec},
        provider_spec::CloudProvider,
    };

    /// Reports Progressing=True for `progressing_reads` reads, then False.
    #[derive(Default)]
    struct FakeControlPlane {
        state: String,
        gcp: bool,
        progressing_reads: usize,
        failing_reads: usize,
        log: Arc<Mutex<Vec<String>>>,
        patches: Mutex<Vec<Value>>,
    }

    impl FakeControlPlane {
        fn active(progressing_reads: usize) -> Self {
            Self {
                state: "Active".to_owned(),
                progressing_reads,
                ..Default::default()
            }
        }

        fn events(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ControlPlaneApi for FakeControlPlane {
        async fn get_machine_set(&self) -> anyhow::Result<ControlPlaneMachineSet> {
            let mut log = self.log.lock().unwrap();
            let reads = log.iter().filter(|e| e.starts_with("get")).count();
            log.push("get".to_owned());

            // the first read belongs to validation
            if reads > 0 && reads <= self.failing_reads {
                return Err(anyhow!("connection refused"));
            }

            let progressing = if reads > self.failing_reads + self.progressing_reads {
                "False"
            } else {
                "True"
            };

            let provider_spec = if self.gcp {
                gcp_provider_spec()
            } else {
                aws_provider_spec()
            };

            Ok(control_plane_machine_set(
                &self.state,
                provider_spec,
                Some(progressing),
            ))
        }

        async fn patch_machine_set(&self, patch: &Value) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("patch {patch}"));
            self.patches.lock().unwrap().push(patch.clone());

            Ok(())
        }
    }

    fn prompter(script: &str) -> crate::resize::prompt::Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        crate::resize::prompt::Prompter::new(Cursor::new(script.as_bytes().to_vec()), Vec::new())
    }

    #[tokio::test]
    async fn patches_and_waits_until_progress_stops() {
        let api = FakeControlPlane::active(2);
        let mut driver = ControlPlaneDriver::new(&api, CloudProvider::Aws, "m5.4xlarge")
            .with_poll_interval(Duration::from_millis(1));

        let phase = driver.run(&mut prompter("y\n")).await.unwrap();

        assert_eq!(phase, ControlPlanePhase::Quiesced);

        let events = api.events();
        assert_eq!(events[0], "get");
        assert!(events[1].starts_with("patch") && events[1].contains("m5.4xlarge"));
        // Progressing=True twice, then False
        assert_eq!(events[2..], ["get", "get", "get"]);
    }

    #[tokio::test]
    async fn declining_aborts_without_patching() {
        let api = FakeControlPlane::active(0);
        let mut driver = ControlPlaneDriver::new(&api, CloudProvider::Aws, "m5.4xlarge")
            .with_poll_interval(Duration::from_millis(1));

        let phase = driver.run(&mut prompter("n\n")).await.unwrap();

        assert_eq!(phase, ControlPlanePhase::Aborted);
        assert_eq!(api.events(), ["get"]);
    }

    #[tokio::test]
    async fn inactive_machine_set_is_fatal() {
        let api = FakeControlPlane {
            state: "Inactive".to_owned(),
            ..Default::default()
        };
        let mut driver = ControlPlaneDriver::new(&api, CloudProvider::Aws, "m5.4xlarge");

        let error = driver.run(&mut prompter("y\n")).await.unwrap_err();

        assert!(error.to_string().contains("validating"));
        assert_eq!(driver.phase(), ControlPlanePhase::Aborted);
        assert_eq!(api.events(), ["get"]);
    }

    #[tokio::test]
    async fn provider_mismatch_aborts_before_patching() {
        let api = FakeControlPlane::active(0);
        let mut driver = ControlPlaneDriver::new(&api, CloudProvider::Gcp, "n2-standard-8");

        let error = driver.run(&mut prompter("y\n")).await.unwrap_err();

        assert!(error.to_string().contains("patching"));
        assert_eq!(driver.phase(), ControlPlanePhase::Aborted);
        assert!(api.patches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gcp_patch_sets_only_machine_type() {
        let api = FakeControlPlane {
            gcp: true,
            ..FakeControlPlane::active(1)
        };
        let mut driver = ControlPlaneDriver::new(&api, CloudProvider::Gcp, "n2-standard-8")
            .with_poll_interval(Duration::from_millis(1));

        let phase = driver.run(&mut prompter("y\n")).await.unwrap();

        assert_eq!(phase, ControlPlanePhase::Quiesced);
        assert_eq!(
            *api.patches.lock().unwrap(),
            vec![json!({ "spec": { "template": { "machines_v1beta1_machine_openshift_io": {
                "spec": { "providerSpec": { "value": { "machineType": "n2-standard-8" } } }
            } } } })]
        );
    }

    #[tokio::test]
    async fn rerun_with_applied_type_skips_patch_and_confirmation() {
        let api = FakeControlPlane::active(0);
        let mut driver = ControlPlaneDriver::new(&api, CloudProvider::Aws, "m5.2xlarge")
            .with_poll_interval(Duration::from_millis(1));

        let phase = driver.run(&mut prompter("")).await.unwrap();

        assert_eq!(phase, ControlPlanePhase::Quiesced);
        assert!(api.events().iter().all(|e| e == "get"));
    }

    #[tokio::test]
    async fn transient_read_errors_keep_polling() {
        let api = FakeControlPlane {
            failing_reads: 2,
            ..FakeControlPlane::active(1)
        };
        let mut driver = ControlPlaneDriver::new(&api, CloudProvider::Aws, "m5.4xlarge")
            .with_poll_interval(Duration::from_millis(1));

        let phase = driver.run(&mut prompter("yes\n")).await.unwrap();

        assert_eq!(phase, ControlPlanePhase::Quiesced);
        assert_eq!(api.events().iter().filter(|e| *e == "get").count(), 5);
    }
}
