//! Test environment lifecycle against a mocked API server
//!
//! The mock answers CRD lookups, applies, lists and deletes, and records
//! every request so tests can assert which CRDs were removed on shutdown.

use envtest::{EnvTestOptions, TestEnv, load_crds, with_test_env_client};
use futures::FutureExt;
use http::{Request, Response, StatusCode};
use kube::Client;
use kube::client::Body;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CRD_PATH: &str = "/apis/apiextensions.k8s.io/v1/customresourcedefinitions";
const FLB_CRD: &str = "foundationloadbalancerconfigs.netoperator.vmware.com";
const IPA_CRD: &str = "ipaddressallocations.netoperator.vmware.com";

type ApiServerHandle = tower_test::mock::Handle<Request<Body>, Response<Body>>;

/// Mock API server serving the CRDs of `net_operator_api`.
struct ApiServer {
    client: Client,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ApiServer {
    /// Start a server on which `preexisting` CRDs are already installed
    fn start(preexisting: &[&str]) -> Self {
        let (service, handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let preexisting = preexisting.iter().map(|name| name.to_string()).collect();
        tokio::spawn(serve(handle, preexisting, Arc::clone(&requests)));
        Self {
            client: Client::new(service, "default"),
            requests,
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn deleted(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| r.strip_prefix("DELETE ").map(str::to_string))
            .collect()
    }
}

async fn serve(mut handle: ApiServerHandle, preexisting: Vec<String>, requests: Arc<Mutex<Vec<String>>>) {
    let crds = established_crds();

    while let Some((request, send)) = handle.next_request().await {
        let method = request.method().clone();
        let name = request
            .uri()
            .path()
            .strip_prefix(CRD_PATH)
            .unwrap_or_default()
            .trim_start_matches('/')
            .to_string();
        requests.lock().unwrap().push(format!("{method} {name}").trim_end().to_string());

        let response = match (method.as_str(), name.as_str()) {
            ("GET", "") => respond(
                StatusCode::OK,
                json!({
                    "apiVersion": "apiextensions.k8s.io/v1",
                    "kind": "CustomResourceDefinitionList",
                    "metadata": {"resourceVersion": "1"},
                    "items": crds.values().cloned().collect::<Vec<_>>(),
                }),
            ),
            ("GET", name) if !preexisting.iter().any(|p| p == name) => not_found(name),
            ("GET" | "PATCH" | "DELETE", name) => match crds.get(name) {
                Some(crd) => respond(StatusCode::OK, crd.clone()),
                None => not_found(name),
            },
            (other, _) => panic!("unexpected {other} request"),
        };
        send.send_response(response);
    }
}

/// CRDs keyed by name, as the API server reports them once established
fn established_crds() -> BTreeMap<String, Value> {
    net_operator_api::scheme()
        .crds()
        .into_iter()
        .map(|crd| {
            let name = crd.metadata.name.clone().unwrap();
            let mut value = serde_json::to_value(&crd).unwrap();
            value["metadata"]["resourceVersion"] = json!("1");
            value["status"] = json!({
                "acceptedNames": {"kind": crd.spec.names.kind, "plural": crd.spec.names.plural},
                "conditions": [{"type": "Established", "status": "True"}],
                "storedVersions": ["v1alpha1"],
            });
            (name, value)
        })
        .collect()
}

fn respond(status: StatusCode, body: Value) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn not_found(name: &str) -> Response<Body> {
    respond(
        StatusCode::NOT_FOUND,
        json!({
            "apiVersion": "v1",
            "kind": "Status",
            "metadata": {},
            "status": "Failure",
            "message": format!("customresourcedefinitions.apiextensions.k8s.io \"{name}\" not found"),
            "reason": "NotFound",
            "code": 404,
        }),
    )
}

fn options() -> EnvTestOptions {
    let manifests = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/crd/bases");
    EnvTestOptions::new([manifests]).with_established_timeout(Duration::from_secs(5))
}

async fn start(server: &ApiServer) -> TestEnv {
    let options = options();
    let crds = load_crds(&options.crd_directory_paths).unwrap();
    TestEnv::start_with_client(server.client.clone(), &options, crds)
        .await
        .unwrap()
}

async fn explode(_client: Client) -> Result<(), anyhow::Error> {
    panic!("closure panicked")
}

#[tokio::test]
async fn test_stop_removes_created_crds_in_reverse_order() {
    let server = ApiServer::start(&[]);

    let env = start(&server).await;
    assert_eq!(env.installed_crds(), [FLB_CRD, IPA_CRD]);
    env.stop().await.unwrap();

    assert_eq!(server.deleted(), vec![IPA_CRD, FLB_CRD]);
}

#[tokio::test]
async fn test_stop_leaves_preexisting_crds_installed() {
    let server = ApiServer::start(&[FLB_CRD, IPA_CRD]);

    let env = start(&server).await;
    assert!(env.installed_crds().is_empty());
    env.stop().await.unwrap();

    let requests = server.requests();
    assert!(requests.contains(&format!("PATCH {FLB_CRD}")));
    assert!(requests.contains(&format!("PATCH {IPA_CRD}")));
    assert!(server.deleted().is_empty(), "deleted CRDs it did not create: {requests:?}");
}

#[tokio::test]
async fn test_stop_removes_only_crds_it_created() {
    let server = ApiServer::start(&[FLB_CRD]);

    let env = start(&server).await;
    assert_eq!(env.installed_crds(), [IPA_CRD]);
    env.stop().await.unwrap();

    assert_eq!(server.deleted(), vec![IPA_CRD]);
}

#[tokio::test]
async fn test_with_test_env_stops_after_success() {
    let server = ApiServer::start(&[]);

    let value = with_test_env_client(server.client.clone(), &options(), |_client| async {
        Ok::<_, anyhow::Error>(42)
    })
    .await
    .unwrap();

    assert_eq!(value, 42);
    assert_eq!(server.deleted(), vec![IPA_CRD, FLB_CRD]);
}

#[tokio::test]
async fn test_with_test_env_stops_after_error() {
    let server = ApiServer::start(&[]);

    let result = with_test_env_client(server.client.clone(), &options(), |_client| async {
        Err::<(), _>(anyhow::anyhow!("closure failed"))
    })
    .await;

    assert_eq!(result.unwrap_err().to_string(), "closure failed");
    assert_eq!(server.deleted(), vec![IPA_CRD, FLB_CRD]);
}

#[tokio::test]
async fn test_with_test_env_stops_and_resumes_panic() {
    let server = ApiServer::start(&[]);

    let outcome = AssertUnwindSafe(with_test_env_client(server.client.clone(), &options(), explode))
        .catch_unwind()
        .await;

    let panic = outcome.unwrap_err();
    assert_eq!(panic.downcast_ref::<&str>(), Some(&"closure panicked"));
    assert_eq!(server.deleted(), vec![IPA_CRD, FLB_CRD]);
}
