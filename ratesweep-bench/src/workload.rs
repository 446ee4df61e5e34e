use futures::future::{BoxFuture, FutureExt};
use rand::Rng;
use ratesweep_client::{Client, Scheme};
use ratesweep_common::{ConfigError, WorkloadError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// An operation the harness can drive at a target rate.
///
/// The harness treats a workload as opaque: it only times `call` and records
/// whether it returned an error.
pub trait Workload: Send + Sync {
    fn name(&self) -> &str;

    fn call(&self) -> BoxFuture<'_, Result<(), WorkloadError>>;
}

/// Workload backed by a closure returning a future.
pub struct FnWorkload<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a [`Workload`].
pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> FnWorkload<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), WorkloadError>> + Send + 'static,
{
    FnWorkload { name: name.into(), f }
}

impl<F, Fut> Workload for FnWorkload<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), WorkloadError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self) -> BoxFuture<'_, Result<(), WorkloadError>> {
        (self.f)().boxed()
    }
}

/// Registered workloads, selectable by name from the command line.
///
/// | name               | operation                                          |
/// |--------------------|----------------------------------------------------|
/// | `get_ss_null`      | GET storage server API root                        |
/// | `get_ac_null`      | GET access-control API root                        |
/// | `get_ac_null_cert` | GET access-control API root with client cert       |
/// | `get_ac_https`     | GET access-control site root over https            |
/// | `get_ss_https`     | GET storage server site root over https            |
/// | `get_ac_http`      | GET access-control site root over http             |
/// | `get_ss_http`      | GET storage server site root over http             |
/// | `get_ac_auth`      | POST a `create`/`storageserver` authorization      |
/// | `get_ss_secret`    | GET latest secret version with a pre-fetched token |
/// | `synthetic`        | local sleep with configurable latency and failures |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    SsNull,
    AcNull,
    AcNullCert,
    AcHttps,
    SsHttps,
    AcHttp,
    SsHttp,
    AcAuth,
    SsSecret,
    Synthetic,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 10] = [
        WorkloadKind::SsNull,
        WorkloadKind::AcNull,
        WorkloadKind::AcNullCert,
        WorkloadKind::AcHttps,
        WorkloadKind::SsHttps,
        WorkloadKind::AcHttp,
        WorkloadKind::SsHttp,
        WorkloadKind::AcAuth,
        WorkloadKind::SsSecret,
        WorkloadKind::Synthetic,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_name() == name)
    }

    pub fn as_name(&self) -> &'static str {
        match self {
            WorkloadKind::SsNull => "get_ss_null",
            WorkloadKind::AcNull => "get_ac_null",
            WorkloadKind::AcNullCert => "get_ac_null_cert",
            WorkloadKind::AcHttps => "get_ac_https",
            WorkloadKind::SsHttps => "get_ss_https",
            WorkloadKind::AcHttp => "get_ac_http",
            WorkloadKind::SsHttp => "get_ss_http",
            WorkloadKind::AcAuth => "get_ac_auth",
            WorkloadKind::SsSecret => "get_ss_secret",
            WorkloadKind::Synthetic => "synthetic",
        }
    }

    /// Whether the workload needs a client certificate (during setup or per call).
    pub fn requires_identity(&self) -> bool {
        matches!(self, WorkloadKind::AcNullCert | WorkloadKind::AcAuth | WorkloadKind::SsSecret)
    }
}

/// Latency and failure profile of the synthetic workload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticProfile {
    pub min_latency: Duration,
    pub max_latency: Duration,
    /// Probability in `0.0..=1.0` that a call fails.
    pub failure_rate: f64,
}

impl Default for SyntheticProfile {
    fn default() -> Self {
        Self {
            min_latency: Duration::from_millis(5),
            max_latency: Duration::from_millis(20),
            failure_rate: 0.0,
        }
    }
}

/// Extra inputs some workloads need.
#[derive(Debug, Clone, Default)]
pub struct WorkloadArgs {
    pub col_uid: Option<Uuid>,
    pub sec_uid: Option<Uuid>,
    pub synthetic: SyntheticProfile,
}

/// Sleeps for a uniformly drawn latency, then fails with `failure_rate` probability.
pub struct SyntheticWorkload {
    profile: SyntheticProfile,
}

impl SyntheticWorkload {
    pub fn new(profile: SyntheticProfile) -> Self {
        Self { profile }
    }

    /// Draw one call's latency and whether it fails.
    pub fn sample(&self, rng: &mut impl Rng) -> (Duration, bool) {
        let SyntheticProfile { min_latency, max_latency, failure_rate } = self.profile;
        let latency = if max_latency > min_latency {
            rng.gen_range(min_latency..=max_latency)
        } else {
            min_latency
        };
        let fail = failure_rate > 0.0 && rng.gen_bool(failure_rate.min(1.0));
        (latency, fail)
    }
}

impl Workload for SyntheticWorkload {
    fn name(&self) -> &str {
        WorkloadKind::Synthetic.as_name()
    }

    fn call(&self) -> BoxFuture<'_, Result<(), WorkloadError>> {
        // ThreadRng is not Send; draw before the first await.
        let (latency, fail) = self.sample(&mut rand::thread_rng());
        async move {
            tokio::time::sleep(latency).await;
            if fail {
                return Err(WorkloadError::Failed("synthetic failure".to_string()));
            }
            Ok(())
        }
        .boxed()
    }
}

/// Token and object ids for `get_ss_secret`, obtained once before the sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretTarget {
    pub token: String,
    pub col_uid: Uuid,
    pub sec_uid: Uuid,
}

/// A registered workload issuing calls through the service client.
pub struct ServiceWorkload {
    kind: WorkloadKind,
    client: Arc<Client>,
    secret: Option<SecretTarget>,
}

impl Workload for ServiceWorkload {
    fn name(&self) -> &str {
        self.kind.as_name()
    }

    fn call(&self) -> BoxFuture<'_, Result<(), WorkloadError>> {
        async move {
            let client = self.client.as_ref();
            match self.kind {
                WorkloadKind::SsNull => client.ss_api_root().await,
                WorkloadKind::AcNull => client.acs_api_root().await,
                WorkloadKind::AcNullCert => client.acs_api_root_with_cert().await,
                WorkloadKind::AcHttps => client.acs_site_root(Scheme::Https).await,
                WorkloadKind::SsHttps => client.ss_site_root(Scheme::Https).await,
                WorkloadKind::AcHttp => client.acs_site_root(Scheme::Http).await,
                WorkloadKind::SsHttp => client.ss_site_root(Scheme::Http).await,
                WorkloadKind::AcAuth => client
                    .create_authorization("create", "storageserver", None)
                    .await
                    .map(|_| ()),
                WorkloadKind::SsSecret => {
                    let target = self.secret.as_ref().ok_or_else(|| {
                        WorkloadError::Failed("secret target was not prepared".to_string())
                    })?;
                    client
                        .secret_data(&target.token, &target.col_uid, &target.sec_uid)
                        .await
                        .map(|_| ())
                }
                WorkloadKind::Synthetic => Err(WorkloadError::Failed(
                    "synthetic workload has no service call".to_string(),
                )),
            }
        }
        .boxed()
    }
}

/// Build the workload for `kind`, running any unmeasured setup it needs.
///
/// `get_ss_secret` obtains a read authorization for the collection and its
/// token here, so the measured calls are only the secret reads.
pub async fn build(
    kind: WorkloadKind,
    client: Arc<Client>,
    args: &WorkloadArgs,
) -> Result<Arc<dyn Workload>, ConfigError> {
    let secret = match kind {
        WorkloadKind::Synthetic => {
            return Ok(Arc::new(SyntheticWorkload::new(args.synthetic)));
        }
        WorkloadKind::SsSecret => Some(prepare_secret(kind, &client, args).await?),
        _ => None,
    };
    Ok(Arc::new(ServiceWorkload { kind, client, secret }))
}

async fn prepare_secret(
    kind: WorkloadKind,
    client: &Client,
    args: &WorkloadArgs,
) -> Result<SecretTarget, ConfigError> {
    let missing = |argument: &str| ConfigError::MissingArgument {
        workload: kind.as_name().to_string(),
        argument: argument.to_string(),
    };
    let col_uid = args.col_uid.ok_or_else(|| missing("col_uid"))?;
    let sec_uid = args.sec_uid.ok_or_else(|| missing("sec_uid"))?;

    let auth_uid = client
        .create_authorization("read", "collection", Some(&col_uid))
        .await
        .map_err(|e| ConfigError::Setup(format!("authorization request failed: {e}")))?;
    let token = client
        .authorization_token(&auth_uid)
        .await
        .map_err(|e| ConfigError::Setup(format!("token fetch failed: {e}")))?;
    tracing::info!(collection = %col_uid, authorization = %auth_uid, "obtained secret read token");

    Ok(SecretTarget { token, col_uid, sec_uid })
}
