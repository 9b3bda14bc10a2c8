use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::Error;
use std::future::{ready, Future, Ready};
use std::pin::Pin;
use tokio::sync::mpsc::UnboundedSender;

pub const READINESS_CHECK_PATH_VARIABLE: &str = "AWS_LWA_READINESS_CHECK_PATH";

/// Path the Lambda web adapter polls before forwarding invocations.
pub fn readiness_check_path() -> String {
    std::env::var(READINESS_CHECK_PATH_VARIABLE).unwrap_or_else(|_| "/".to_string())
}

/// Signals the trace flush extension once a response has been produced.
/// A no-op when no channel is configured, e.g. outside of Lambda.
#[derive(Clone, Default)]
pub struct RequestDone {
    channel: Option<UnboundedSender<()>>,
    skip_paths: Vec<String>,
}

impl RequestDone {
    pub fn new(channel: Option<UnboundedSender<()>>) -> Self {
        Self {
            channel,
            skip_paths: Vec::new(),
        }
    }

    /// Requests to `path` are not invocations and never signal.
    pub fn skip_path(mut self, path: impl Into<String>) -> Self {
        self.skip_paths.push(path.into());
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestDone
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestDoneMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestDoneMiddleware {
            service,
            channel: self.channel.clone(),
            skip_paths: self.skip_paths.clone(),
        }))
    }
}

pub struct RequestDoneMiddleware<S> {
    service: S,
    channel: Option<UnboundedSender<()>>,
    skip_paths: Vec<String>,
}

impl<S, B> Service<ServiceRequest> for RequestDoneMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let channel = if self.skip_paths.iter().any(|path| path == req.path()) {
            None
        } else {
            self.channel.clone()
        };
        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await;
            if let Some(channel) = channel {
                // The receiver is gone once the extension has shut down.
                let _ = channel.send(());
            }
            res
        })
    }
}
