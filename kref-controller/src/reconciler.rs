//! The Pod reconciler
use crate::Error;
use k8s_openapi::api::core::v1::Pod;
use kref_logs::{kobj, kref, Logger};
use kube::runtime::controller::Action;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

/// Data shared by every reconcile call
#[derive(Clone, Debug)]
pub struct Context {
    /// Where the reconciler logs to
    pub logger: Logger,
}

/// Logs a reference to the demo pod, lazily and pre-rendered
///
/// Then waits for the next change to the pod.
///
/// # Errors
/// Never; the signature is what the controller runtime expects.
pub async fn reconcile(_pod: Arc<Pod>, ctx: Arc<Context>) -> Result<Action, Error> {
    ctx.logger.in_scope(|| {
        let pod = kref("default", "pod-1");
        info!(pod = %pod, "Test log");
        info!(pod = %pod.to_string(), "Test log with to_string()");

        // debug!("Verbosity 1");
        // debug!("Verbosity 2");
        // debug!("Verbosity 3");
        // trace!("Verbosity 4");
    });
    Ok(Action::await_change())
}

/// Requeues a failed object after five minutes
pub fn error_policy(pod: Arc<Pod>, error: &Error, ctx: Arc<Context>) -> Action {
    ctx.logger
        .in_scope(|| warn!(pod = %kobj(pod.as_ref()), %error, "reconcile failed"));
    Action::requeue(Duration::from_secs(5 * 60))
}

#[cfg(test)]
mod tests {
    use super::{error_policy, reconcile, Context};
    use crate::Error;
    use assert_json_diff::assert_json_include;
    use k8s_openapi::{api::core::v1::Pod, apimachinery::pkg::apis::meta::v1::ObjectMeta};
    use kref_logs::{LogFormat, LoggingOptions, SharedBuffer};
    use kube::runtime::controller::Action;
    use serde_json::{json, Value};
    use std::{sync::Arc, time::Duration};

    fn context(format: LogFormat) -> (Arc<Context>, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let logger = LoggingOptions {
            format,
            caller: false,
            ..LoggingOptions::default()
        }
        .build_with_writer(buffer.clone(), false)
        .unwrap();
        (Arc::new(Context { logger }), buffer)
    }

    fn pod(namespace: &str, name: &str) -> Arc<Pod> {
        Arc::new(Pod {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some(namespace.into()),
                ..ObjectMeta::default()
            },
            ..Pod::default()
        })
    }

    #[tokio::test]
    async fn reconcile_awaits_change_for_any_pod() {
        for obj in [Arc::new(Pod::default()), pod("kube-system", "coredns")] {
            let (ctx, _) = context(LogFormat::Text);
            let action = reconcile(obj, ctx).await.unwrap();
            assert_eq!(action, Action::await_change());
        }
    }

    #[tokio::test]
    async fn reconcile_logs_the_demo_reference_twice() {
        let (ctx, buffer) = context(LogFormat::Json);
        reconcile(pod("default", "anything"), ctx).await.unwrap();

        let records = buffer
            .lines()
            .iter()
            .map(|line| serde_json::from_str::<Value>(line).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(records.len(), 2);
        assert_json_include!(
            actual: &records[0],
            expected: json!({"level": "INFO", "msg": "Test log", "pod": "default/pod-1"})
        );
        assert_json_include!(
            actual: &records[1],
            expected: json!({
                "level": "INFO",
                "msg": "Test log with to_string()",
                "pod": "default/pod-1",
            })
        );
    }

    #[tokio::test]
    async fn reconcile_text_lines_carry_the_reference() {
        let (ctx, buffer) = context(LogFormat::Text);
        reconcile(pod("default", "anything"), ctx).await.unwrap();
        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|line| line.ends_with("pod=default/pod-1")));
    }

    #[test]
    fn error_policy_requeues_later() {
        let (ctx, buffer) = context(LogFormat::Json);
        let error = Error::Logging(kref_logs::Error::UnknownFormat("yaml".into()));
        let action = error_policy(pod("default", "web-0"), &error, ctx);
        assert_eq!(action, Action::requeue(Duration::from_secs(300)));

        let record: Value = serde_json::from_str(&buffer.lines()[0]).unwrap();
        assert_json_include!(
            actual: record,
            expected: json!({"level": "WARN", "pod": "default/web-0"})
        );
    }
}
