use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use futures_util::future::BoxFuture;
use log::*;
use thiserror::Error;

use crate::dispatcher::{CommandError, Envelope, Handler, Request, RequestScope};

type Route<R> = Arc<
    dyn Fn(RequestScope, R) -> BoxFuture<'static, Result<<R as Request>::Response, CommandError>> + Send + Sync,
>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("More than one handler was registered for {0}")]
    DuplicateHandler(&'static str),
    #[error("No handler is registered for {0}")]
    NoHandler(&'static str),
}

/// Collects the request handlers. Call [`DispatcherBuilder::build`] once every handler has been registered.
#[derive(Default)]
pub struct DispatcherBuilder {
    routes: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    duplicates: Vec<&'static str>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` as the source of handlers for requests of type `R`. The factory is called once per
    /// request, with that request's scope.
    pub fn register<R, H, F>(self, factory: F) -> Self
    where
        R: Request,
        H: Handler<R>,
        F: Fn(&RequestScope) -> H + Send + Sync + 'static,
    {
        let route: Route<R> = Arc::new(move |scope, request| factory(&scope).handle(request));
        self.insert_route::<R>(route)
    }

    /// Registers a plain async function as the handler for requests of type `R`.
    pub fn register_fn<R, F, Fut>(self, f: F) -> Self
    where
        R: Request,
        F: Fn(R) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R::Response, CommandError>> + Send + 'static,
    {
        let route: Route<R> = Arc::new(move |_scope, request| Box::pin(f(request)));
        self.insert_route::<R>(route)
    }

    fn insert_route<R: Request>(mut self, route: Route<R>) -> Self {
        if self.routes.insert(TypeId::of::<R>(), Box::new(route)).is_some() {
            self.duplicates.push(type_name::<R>());
        }
        self
    }

    pub fn build(self) -> Result<Dispatcher, DispatchError> {
        if let Some(name) = self.duplicates.first().copied() {
            error!("📨️ Duplicate handler registration for {name}");
            return Err(DispatchError::DuplicateHandler(name));
        }
        debug!("📨️ Dispatcher ready with {} request types", self.routes.len());
        Ok(Dispatcher { routes: Arc::new(self.routes), next_request_id: Arc::new(AtomicU64::new(1)) })
    }
}

/// Routes requests to their handlers and wraps the outcome in an [`Envelope`]. Cloning is cheap and clones share
/// the same routes.
#[derive(Clone)]
pub struct Dispatcher {
    routes: Arc<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
    next_request_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Dispatcher ({} routes)", self.routes.len())
    }
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn handles<R: Request>(&self) -> bool {
        self.routes.contains_key(&TypeId::of::<R>())
    }

    pub async fn dispatch<R: Request>(&self, request: R) -> Result<Envelope<R::Response>, DispatchError> {
        let route = self
            .routes
            .get(&TypeId::of::<R>())
            .and_then(|r| r.downcast_ref::<Route<R>>())
            .cloned()
            .ok_or(DispatchError::NoHandler(type_name::<R>()))?;
        let scope = RequestScope::new(self.next_request_id.fetch_add(1, Ordering::Relaxed));
        let request_id = scope.request_id;
        let started_at = scope.started_at;
        trace!("📨️ [{request_id}] Dispatching {}", type_name::<R>());
        let envelope = match route(scope, request).await {
            Ok(data) => Envelope::success(data),
            Err(CommandError::Business { code, message }) => {
                debug!("📨️ [{request_id}] {code}: {message}");
                Envelope::failure(code)
            },
            Err(e @ CommandError::Infrastructure(_)) => {
                error!("📨️ [{request_id}] {} failed. {e}", type_name::<R>());
                Envelope::failure(e.code())
            },
        };
        trace!("📨️ [{request_id}] Done in {}ms", started_at.elapsed().as_millis());
        Ok(envelope)
    }
}

#[cfg(test)]
mod test {
    use std::sync::{atomic::AtomicUsize, Mutex};

    use super::*;
    use crate::wpe_api::errors::ErrorCode;

    struct Ping(u32);
    impl Request for Ping {
        type Response = u32;
    }

    struct Pong;
    impl Request for Pong {
        type Response = ();
    }

    struct PingHandler {
        calls: Arc<AtomicUsize>,
    }

    impl Handler<Ping> for PingHandler {
        fn handle(self, request: Ping) -> BoxFuture<'static, Result<u32, CommandError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                match request.0 {
                    0 => Err(CommandError::business(ErrorCode::InvalidAmount, "zero")),
                    1 => Err(CommandError::Infrastructure("db is down".into())),
                    n => Ok(n),
                }
            })
        }
    }

    fn ping_dispatcher(scopes: Arc<Mutex<Vec<u64>>>, calls: Arc<AtomicUsize>) -> Dispatcher {
        DispatcherBuilder::new()
            .register::<Ping, _, _>(move |scope| {
                scopes.lock().unwrap().push(scope.request_id);
                PingHandler { calls: calls.clone() }
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn envelopes_carry_the_outcome() {
        let dispatcher = ping_dispatcher(Arc::default(), Arc::default());
        assert_eq!(dispatcher.dispatch(Ping(42)).await.unwrap(), Envelope::success(42));
        let failure = dispatcher.dispatch(Ping(0)).await.unwrap();
        assert_eq!(failure, Envelope::Failure { code: ErrorCode::InvalidAmount, status: 400 });
        let failure = dispatcher.dispatch(Ping(1)).await.unwrap();
        assert_eq!(failure, Envelope::Failure { code: ErrorCode::GenericFailure, status: 500 });
    }

    #[tokio::test]
    async fn a_fresh_handler_per_call() {
        let scopes = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = ping_dispatcher(scopes.clone(), calls.clone());
        for i in 2..7 {
            dispatcher.clone().dispatch(Ping(i)).await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(*scopes.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn missing_handlers_are_configuration_errors() {
        let dispatcher = ping_dispatcher(Arc::default(), Arc::default());
        assert!(dispatcher.handles::<Ping>());
        assert!(!dispatcher.handles::<Pong>());
        let err = dispatcher.dispatch(Pong).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoHandler(name) if name.ends_with("Pong")));
    }

    #[test]
    fn duplicate_handlers_are_rejected_at_build_time() {
        let err = DispatcherBuilder::new()
            .register_fn(|_: Pong| async { Ok::<_, CommandError>(()) })
            .register_fn(|p: Ping| async move { Ok::<_, CommandError>(p.0) })
            .register_fn(|_: Pong| async { Ok::<_, CommandError>(()) })
            .build()
            .unwrap_err();
        assert!(matches!(err, DispatchError::DuplicateHandler(name) if name.ends_with("Pong")));
    }
}
