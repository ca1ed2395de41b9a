// # Ingress Source Trait
//
// Defines the interface for receiving Ingress changes from the cluster.
//
// ## Implementations
//
// - Kubernetes API watcher: `ingress-mdns-kube` crate
//
// ## Usage
//
// ```rust,ignore
// use ingress_mdns_core::IngressSource;
// use tokio_stream::StreamExt;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IngressSource implementation */;
//
//     let mut stream = source.watch();
//     while let Some(event) = stream.next().await {
//         println!("{:?} {}", event.kind(), event.object_key());
//     }
//
//     Ok(())
// }
// ```

use k8s_openapi::api::networking::v1::Ingress;
use std::pin::Pin;
use tokio_stream::Stream;

/// A change to one Ingress object, as delivered by the watch
///
/// The variant carries the payload, so consumers never downcast.
#[derive(Debug, Clone)]
pub enum IngressEvent {
    /// An Ingress appeared (or was listed on startup)
    Added(Ingress),

    /// An Ingress changed; `old` is the last version seen before `new`
    Updated {
        old: Box<Ingress>,
        new: Box<Ingress>,
    },

    /// An Ingress was removed; carries the last version seen
    Deleted(Ingress),
}

/// Kind of an [`IngressEvent`], for logging and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngressEventKind {
    Added,
    Updated,
    Deleted,
}

impl IngressEvent {
    /// Create an update event from distinct before/after objects
    pub fn updated(old: Ingress, new: Ingress) -> Self {
        Self::Updated {
            old: Box::new(old),
            new: Box::new(new),
        }
    }

    pub fn kind(&self) -> IngressEventKind {
        match self {
            IngressEvent::Added(_) => IngressEventKind::Added,
            IngressEvent::Updated { .. } => IngressEventKind::Updated,
            IngressEvent::Deleted(_) => IngressEventKind::Deleted,
        }
    }

    /// `namespace/name` of the Ingress this event is about
    pub fn object_key(&self) -> String {
        let ingress = match self {
            IngressEvent::Added(ingress) | IngressEvent::Deleted(ingress) => ingress,
            IngressEvent::Updated { new, .. } => new.as_ref(),
        };
        object_key(ingress)
    }
}

/// `namespace/name` of an Ingress
pub fn object_key(ingress: &Ingress) -> String {
    format!(
        "{}/{}",
        ingress.metadata.namespace.as_deref().unwrap_or("default"),
        ingress.metadata.name.as_deref().unwrap_or("<unnamed>")
    )
}

/// Trait for Ingress watch implementations
///
/// # Delivery Contract
///
/// The stream returned by [`IngressSource::watch`] must:
/// - Replay every existing Ingress as [`IngressEvent::Added`] when first polled
///   (list-then-watch), so the engine needs no bootstrap logic
/// - Eventually deliver every create, update and delete after that
/// - Deliver `Updated` with genuinely distinct before/after objects
/// - Release its cluster connection when dropped
///
/// Events are consumed one at a time by the engine, in stream order. A source
/// must not expect the engine to poll it while an event is being handled.
pub trait IngressSource: Send + Sync {
    /// Watch Ingress objects across all namespaces
    ///
    /// # Returns
    ///
    /// A pinned boxed stream of `IngressEvent` items
    fn watch(&self) -> Pin<Box<dyn Stream<Item = IngressEvent> + Send + 'static>>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
