use serde_json::{json, Value};

use super::{cpms::ControlPlaneMachineSet, machinepool::MachinePool};

pub(crate) fn infra_pool(replicas: i64, instance_type: &str) -> MachinePool {
    serde_json::from_value(json!({
        "apiVersion": "hive.openshift.io/v1",
        "kind": "MachinePool",
        "metadata": {
            "name": "mycluster-infra",
            "namespace": "uhc-production-abc",
            "uid": "5d0c8d63-7e9b-4b2f-a8b8-0d4d8d6d1a11",
            "resourceVersion": "123456",
            "generation": 4,
            "creationTimestamp": "2023-01-01T00:00:00Z",
            "finalizers": ["hive.openshift.io/remotemachineset"]
        },
        "spec": {
            "clusterDeploymentRef": { "name": "mycluster" },
            "name": "infra",
            "platform": { "aws": { "type": instance_type, "zones": ["us-east-1a"] } },
            "replicas": replicas,
            "labels": { "node-role.kubernetes.io/infra": "" },
            "taints": [{ "effect": "NoSchedule", "key": "node-role.kubernetes.io/infra" }]
        },
        "status": { "replicas": replicas }
    }))
    .unwrap()
}

pub(crate) fn aws_provider_spec() -> Value {
    json!({
        "apiVersion": "machine.openshift.io/v1beta1",
        "kind": "AWSMachineProviderConfig",
        "ami": { "id": "ami-0123456789" },
        "blockDevices": [{ "ebs": { "encrypted": true, "iops": 0, "volumeSize": 350, "volumeType": "gp3" } }],
        "credentialsSecret": { "name": "aws-cloud-credentials" },
        "iamInstanceProfile": { "id": "mycluster-master-profile" },
        "instanceType": "m5.2xlarge",
        "placement": { "availabilityZone": "", "region": "us-east-1" },
        "userDataSecret": { "name": "master-user-data" }
    })
}

pub(crate) fn gcp_provider_spec() -> Value {
    json!({
        "apiVersion": "machine.openshift.io/v1beta1",
        "kind": "GCPMachineProviderSpec",
        "canIPForward": false,
        "credentialsSecret": { "name": "gcp-cloud-credentials" },
        "deletionProtection": false,
        "disks": [{ "autoDelete": true, "boot": true, "image": "projects/rhcos-cloud/global/images/rhcos", "sizeGb": 128, "type": "pd-ssd" }],
        "machineType": "custom-4-16384",
        "networkInterfaces": [{ "network": "mycluster-network", "subnetwork": "mycluster-master-subnet" }],
        "projectID": "my-project",
        "region": "us-central1",
        "serviceAccounts": [{ "email": "mycluster-m@my-project.iam.gserviceaccount.com", "scopes": ["https://www.googleapis.com/auth/cloud-platform"] }],
        "tags": ["mycluster-master"],
        "userDataSecret": { "name": "master-user-data" }
    })
}

pub(crate) fn control_plane_machine_set(
    state: &str,
    provider_spec: Value,
    progressing: Option<&str>,
) -> ControlPlaneMachineSet {
    let conditions = match progressing {
        Some(status) => json!([
            { "type": "Available", "status": "True" },
            { "type": "Progressing", "status": status, "reason": "NeedsUpdateReplicas" }
        ]),
        None => json!([]),
    };

    serde_json::from_value(json!({
        "apiVersion": "machine.openshift.io/v1",
        "kind": "ControlPlaneMachineSet",
        "metadata": {
            "name": "cluster",
            "namespace": "openshift-machine-api",
            "resourceVersion": "98765",
            "generation": 2
        },
        "spec": {
            "replicas": 3,
            "state": state,
            "selector": { "matchLabels": { "machine.openshift.io/cluster-api-machine-role": "master" } },
            "strategy": { "type": "RollingUpdate" },
            "template": {
                "machineType": "machines_v1beta1_machine_openshift_io",
                "machines_v1beta1_machine_openshift_io": {
                    "failureDomains": { "platform": "AWS" },
                    "metadata": { "labels": { "machine.openshift.io/cluster-api-machine-role": "master" } },
                    "spec": {
                        "lifecycleHooks": {},
                        "metadata": {},
                        "providerSpec": { "value": provider_spec }
                    }
                }
            }
        },
        "status": { "conditions": conditions, "replicas": 3, "readyReplicas": 3 }
    }))
    .unwrap()
}
