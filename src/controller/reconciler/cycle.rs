//! # Reconcile Cycle
//!
//! One pass for one record:
//!
//! 1. Re-read the record; stop if it is gone
//! 2. Derive its [`Lifecycle`] from finalizer and deletion flag
//! 3. Resolve targets and run read, plan, execute against each of them
//! 4. Write status, add or remove the cleanup finalizer, emit an event on failure
//!
//! Every target is attempted even after one fails; the first error is reported.
//! A failed cycle returns the error so the error policy requeues it after the
//! fixed delay.

use super::lifecycle::{apply_guard, Lifecycle};
use super::status::update_status;
use super::targets::Target;
use super::{Reconciler, ReconcilerError, Result};
use crate::cluster::RecordStore;
use crate::controller::plan::deletion_requested;
use crate::crd::ResourceStatus;
use crate::keycloak::KeycloakAdmin;
use crate::observability;
use async_trait::async_trait;
use kube::runtime::events::EventType;
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// A custom resource the operator converges into Keycloak
#[async_trait]
pub trait Reconcilable: Resource<DynamicType = ()> + Clone + Debug + Send + Sync + 'static {
    /// Kind used in logs and metric labels
    const KIND: &'static str;

    fn resource_status(&self) -> Option<&ResourceStatus>;

    fn store(ctx: &Reconciler) -> &dyn RecordStore<Self>;

    /// Keycloak instances and realms this record applies to
    async fn targets(&self, ctx: &Reconciler) -> Result<Vec<Target>>;

    /// Read, plan and execute against one target
    async fn sync(&self, ctx: &Reconciler, target: &Target, admin: &dyn KeycloakAdmin)
        -> Result<()>;
}

/// Run one reconcile cycle for `record`
pub async fn reconcile<K: Reconcilable>(record: Arc<K>, ctx: Arc<Reconciler>) -> Result<Action> {
    let name = record.name_any();
    let namespace = record.namespace().unwrap_or_default();
    let span = info_span!(
        "controller.reconcile",
        resource.kind = K::KIND,
        resource.name = %name,
        resource.namespace = %namespace
    );

    async move {
        let start = Instant::now();
        observability::metrics::increment_reconciliations(K::KIND);
        let result = run_cycle::<K>(&namespace, &name, &ctx).await;
        observability::metrics::observe_reconciliation_duration(
            K::KIND,
            start.elapsed().as_secs_f64(),
        );
        result
    }
    .instrument(span)
    .await
}

async fn run_cycle<K: Reconcilable>(namespace: &str, name: &str, ctx: &Reconciler) -> Result<Action> {
    let store = K::store(ctx);
    let Some(record) = store.get(namespace, name).await? else {
        debug!("{} {}/{} no longer exists", K::KIND, namespace, name);
        return Ok(Action::await_change());
    };

    let finalizer = ctx.config.finalizer_name.as_str();
    let guarded = record.finalizers().iter().any(|f| f == finalizer);
    let Some(lifecycle) =
        Lifecycle::observe(guarded, deletion_requested(&record), record.resource_status())
    else {
        debug!("Deletion requested without cleanup finalizer, nothing to clean up");
        return Ok(Action::await_change());
    };

    let outcome = sync_targets(&record, ctx).await;
    let transition = lifecycle.on_outcome(outcome.is_ok());
    debug!(
        from = ?lifecycle,
        to = ?transition.next,
        guard = ?transition.guard,
        "Lifecycle transition"
    );

    let status = match &outcome {
        Ok(()) => ResourceStatus::reconciled(),
        Err(e) => ResourceStatus::failing(e.to_string()),
    };
    update_status(store, &record, record.resource_status(), status).await?;
    if let Some(finalizers) = apply_guard(record.finalizers(), finalizer, transition.guard) {
        store.set_finalizers(&record, finalizers).await?;
    }

    match outcome {
        Ok(()) => {
            info!("{} {}/{} reconciled", K::KIND, namespace, name);
            Ok(Action::await_change())
        }
        Err(e) => {
            ctx.events
                .publish(
                    &record.object_ref(&()),
                    EventType::Warning,
                    "ReconcileFailed",
                    &e.to_string(),
                )
                .await;
            Err(e)
        }
    }
}

async fn sync_targets<K: Reconcilable>(record: &K, ctx: &Reconciler) -> Result<()> {
    let targets = record.targets(ctx).await?;
    if targets.is_empty() {
        info!("No Keycloak instance matches the selectors, nothing to reconcile");
        return Ok(());
    }

    let mut first_error: Option<ReconcilerError> = None;
    for target in &targets {
        let result = async {
            let admin = ctx.connector.connect(&target.keycloak).await?;
            record.sync(ctx, target, admin.as_ref()).await
        }
        .await;
        match result {
            Ok(()) => debug!(target = %target.label(), "Target converged"),
            Err(e) => {
                warn!(target = %target.label(), error = %e, "Target failed");
                first_error.get_or_insert(e);
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::{FakeKeycloak, TestContext};
    use crate::crd::{
        Keycloak, KeycloakClient, KeycloakClientSpec, KeycloakRealm, KeycloakRealmSpec,
        KeycloakSpec, ScopeMappings, Selector, StatusPhase,
    };
    use crate::keycloak::{ClientRepresentation, RealmRepresentation, RoleRepresentation};
    use std::collections::BTreeMap;

    const NS: &str = "apps";
    const GUARD: &str = "keycloak.org/cleanup";

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn keycloak(name: &str) -> Keycloak {
        let mut kc = Keycloak::new(name, KeycloakSpec::default());
        kc.metadata.namespace = Some(NS.to_string());
        kc.metadata.labels = Some(labels(&[("app", "sso")]));
        kc
    }

    fn realm_record(selector: Option<Selector>) -> KeycloakRealm {
        let mut record = KeycloakRealm::new(
            "acme",
            KeycloakRealmSpec {
                instance_selector: selector,
                realm: RealmRepresentation {
                    realm: "acme".to_string(),
                    enabled: Some(true),
                    ..Default::default()
                },
            },
        );
        record.metadata.namespace = Some(NS.to_string());
        record.metadata.labels = Some(labels(&[("realm", "acme")]));
        record
    }

    fn client_record() -> KeycloakClient {
        let role = |name: &str| RoleRepresentation {
            name: name.to_string(),
            ..Default::default()
        };
        let mut record = KeycloakClient::new(
            "web",
            KeycloakClientSpec {
                realm_selector: Some(Selector::from_labels([("realm", "acme")])),
                client: ClientRepresentation {
                    client_id: "web".to_string(),
                    public_client: Some(true),
                    ..Default::default()
                },
                roles: vec![role("viewer"), role("editor"), role("admin")],
                ..Default::default()
            },
        );
        record.metadata.namespace = Some(NS.to_string());
        record
    }

    fn sso_selector() -> Option<Selector> {
        Some(Selector::from_labels([("app", "sso")]))
    }

    fn mark_deleted<K: Resource>(record: &mut K) {
        record.meta_mut().deletion_timestamp =
            Some(serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z")).unwrap());
    }

    /// One Keycloak `sso` holding realm `acme`, plus the realm record selecting it
    fn client_setup() -> (TestContext, Arc<FakeKeycloak>) {
        let ctx = TestContext::default();
        let fake = Arc::new(FakeKeycloak::with_realm("acme"));
        ctx.keycloaks.insert(keycloak("sso"));
        ctx.connector.register("sso", fake.clone());
        ctx.realms.insert(realm_record(sso_selector()));
        ctx.clients.insert(client_record());
        (ctx, fake)
    }

    async fn reconcile_client(ctx: &TestContext) -> Result<Action> {
        let record = ctx.clients.record(NS, "web").expect("client record");
        reconcile(Arc::new(record), ctx.reconciler()).await
    }

    fn finalizers<K: Resource>(record: &K) -> Vec<String> {
        record.meta().finalizers.clone().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_fan_out_attempts_every_target() {
        let ctx = TestContext::default();
        let broken = Arc::new(FakeKeycloak::default());
        broken.fail_on("ping");
        let healthy = Arc::new(FakeKeycloak::default());
        ctx.keycloaks.insert(keycloak("sso-a"));
        ctx.keycloaks.insert(keycloak("sso-b"));
        ctx.connector.register("sso-a", broken.clone());
        ctx.connector.register("sso-b", healthy.clone());
        ctx.realms.insert(realm_record(sso_selector()));

        let record = ctx.realms.record(NS, "acme").unwrap();
        let err = reconcile(Arc::new(record), ctx.reconciler())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Ping Keycloak"), "{err}");
        // The first target failing does not stop the second one
        assert!(healthy.has_realm("acme"));
        assert_eq!(healthy.calls(), vec!["ping", "create_realm:acme"]);
        assert!(broken.calls().is_empty());

        let stored = ctx.realms.record(NS, "acme").unwrap();
        let status = stored.status.clone().unwrap();
        assert_eq!(status.phase, Some(StatusPhase::Failing));
        assert!(!status.ready);
        assert_eq!(status.message, err.to_string());
        // A failed first cycle never adds the cleanup finalizer
        assert!(finalizers(&stored).is_empty());
        assert_eq!(ctx.events.events().len(), 1);
        assert_eq!(ctx.events.events()[0].0, "ReconcileFailed");
    }

    #[tokio::test]
    async fn test_unreachable_instance_fails_cycle() {
        let ctx = TestContext::default();
        ctx.keycloaks.insert(keycloak("sso"));
        ctx.realms.insert(realm_record(sso_selector()));

        let record = ctx.realms.record(NS, "acme").unwrap();
        let err = reconcile(Arc::new(record), ctx.reconciler())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcilerError::Keycloak(crate::keycloak::KeycloakError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_partial_failure_then_convergence() {
        let (ctx, fake) = client_setup();
        // Ping, create client, three roles: the third action fails
        fake.fail_on("create_client_role:viewer");

        reconcile_client(&ctx).await.unwrap_err();

        assert_eq!(fake.take_calls(), vec!["ping", "create_client:web"]);
        let stored = ctx.clients.record(NS, "web").unwrap();
        let status = stored.status.clone().unwrap();
        assert_eq!(status.phase, Some(StatusPhase::Failing));
        assert!(status
            .message
            .starts_with("Create client role viewer of client web in realm acme"));
        assert!(finalizers(&stored).is_empty());

        fake.clear_failures();
        let action = reconcile_client(&ctx).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(
            fake.take_calls(),
            vec![
                "ping",
                "create_client_role:viewer",
                "create_client_role:editor",
                "create_client_role:admin"
            ]
        );
        let stored = ctx.clients.record(NS, "web").unwrap();
        assert_eq!(stored.status, Some(ResourceStatus::reconciled()));
        assert_eq!(finalizers(&stored), vec![GUARD.to_string()]);

        // Converged: only the pre-flight ping
        reconcile_client(&ctx).await.unwrap();
        assert_eq!(fake.take_calls(), vec!["ping"]);
        assert_eq!(
            fake.client_role_names("acme", "web"),
            vec!["viewer", "editor", "admin"]
        );
    }

    #[tokio::test]
    async fn test_deletion_cleans_up_and_releases_finalizer() {
        let (ctx, fake) = client_setup();
        reconcile_client(&ctx).await.unwrap();
        assert!(fake.client("acme", "web").is_some());
        fake.take_calls();

        ctx.clients.update(NS, "web", mark_deleted);
        reconcile_client(&ctx).await.unwrap();

        assert_eq!(fake.take_calls(), vec!["ping", "delete_client:web"]);
        assert!(fake.client("acme", "web").is_none());
        // The API server finalizes the record once the guard is gone
        assert!(ctx.clients.record(NS, "web").is_none());
    }

    #[tokio::test]
    async fn test_deletion_ignores_vanished_scope_mapping_source() {
        let (ctx, fake) = client_setup();
        ctx.clients.update(NS, "web", |record| {
            record.spec.scope_mappings = Some(ScopeMappings {
                client_mappings: BTreeMap::from([(
                    "api".to_string(),
                    vec![RoleRepresentation {
                        name: "read".to_string(),
                        ..Default::default()
                    }],
                )]),
                ..Default::default()
            });
            record.metadata.finalizers = Some(vec![GUARD.to_string()]);
            mark_deleted(record);
        });

        let action = reconcile_client(&ctx).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(fake.take_calls(), vec!["ping", "delete_client:web"]);
        assert!(ctx.clients.record(NS, "web").is_none());
    }

    #[tokio::test]
    async fn test_deletion_succeeds_when_realm_is_gone() {
        let ctx = TestContext::default();
        let fake = Arc::new(FakeKeycloak::default());
        ctx.keycloaks.insert(keycloak("sso"));
        ctx.connector.register("sso", fake.clone());
        ctx.realms.insert(realm_record(sso_selector()));
        let mut record = client_record();
        record.metadata.finalizers = Some(vec![GUARD.to_string()]);
        mark_deleted(&mut record);
        ctx.clients.insert(record);

        reconcile_client(&ctx).await.unwrap();

        assert_eq!(fake.calls(), vec!["ping", "delete_client:web"]);
        assert!(ctx.clients.record(NS, "web").is_none());
    }

    #[tokio::test]
    async fn test_client_fans_out_over_every_selected_realm() {
        let ctx = TestContext::default();
        let first = Arc::new(FakeKeycloak::with_realm("acme"));
        let second = Arc::new(FakeKeycloak::with_realm("beta"));
        second.fail_on("create_client:web");

        for (name, app) in [("sso-a", "a"), ("sso-b", "b")] {
            let mut instance = keycloak(name);
            instance.metadata.labels = Some(labels(&[("app", app)]));
            ctx.keycloaks.insert(instance);
        }
        ctx.connector.register("sso-a", first.clone());
        ctx.connector.register("sso-b", second.clone());

        for (realm, app) in [("acme", "a"), ("beta", "b")] {
            let mut record = realm_record(Some(Selector::from_labels([("app", app)])));
            record.metadata.name = Some(realm.to_string());
            record.metadata.labels = Some(labels(&[("team", "web")]));
            record.spec.realm.realm = realm.to_string();
            ctx.realms.insert(record);
        }

        let mut client = client_record();
        client.spec.realm_selector = Some(Selector::from_labels([("team", "web")]));
        client.spec.roles.clear();
        ctx.clients.insert(client);

        let err = reconcile_client(&ctx).await.unwrap_err();

        assert!(err.to_string().contains("Create client web in realm beta"), "{err}");
        // One reader, planner and executor pass per realm
        assert_eq!(first.calls(), vec!["ping", "create_client:web"]);
        assert_eq!(second.calls(), vec!["ping"]);
        assert!(first.client("acme", "web").is_some());
        assert!(second.client("beta", "web").is_none());

        let stored = ctx.clients.record(NS, "web").unwrap();
        assert_eq!(stored.status.unwrap().phase, Some(StatusPhase::Failing));
        assert!(finalizers(&ctx.clients.record(NS, "web").unwrap()).is_empty());
    }

    #[tokio::test]
    async fn test_failed_deletion_keeps_finalizer() {
        let (ctx, fake) = client_setup();
        reconcile_client(&ctx).await.unwrap();
        ctx.clients.update(NS, "web", mark_deleted);
        fake.fail_on("delete_client:web");

        reconcile_client(&ctx).await.unwrap_err();

        let stored = ctx.clients.record(NS, "web").unwrap();
        assert_eq!(finalizers(&stored), vec![GUARD.to_string()]);
        assert_eq!(stored.status.unwrap().phase, Some(StatusPhase::Failing));
    }

    #[tokio::test]
    async fn test_deletion_without_finalizer_is_a_no_op() {
        let (ctx, fake) = client_setup();
        ctx.clients.update(NS, "web", mark_deleted);

        let action = reconcile_client(&ctx).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_targets_is_success() {
        let ctx = TestContext::default();
        ctx.realms.insert(realm_record(None));

        let record = ctx.realms.record(NS, "acme").unwrap();
        reconcile(Arc::new(record), ctx.reconciler()).await.unwrap();

        let stored = ctx.realms.record(NS, "acme").unwrap();
        assert_eq!(stored.status, Some(ResourceStatus::reconciled()));
        assert_eq!(finalizers(&stored), vec![GUARD.to_string()]);
    }

    #[tokio::test]
    async fn test_missing_record_awaits_change() {
        let ctx = TestContext::default();
        let record = realm_record(sso_selector());

        let action = reconcile(Arc::new(record), ctx.reconciler()).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert!(ctx.events.events().is_empty());
    }
}
