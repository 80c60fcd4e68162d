use crate::Router;
use hyper::{body::Body, service::Service, Request, Response};
use std::{
	convert::Infallible,
	future::{ready, Ready},
	sync::Arc,
	task::{Context, Poll},
};

/// Makes a [`Router`] servable by hyper: hand it to `Server::serve`.
#[derive(Clone)]
pub struct HttpRouter {
	router: Arc<Router>,
}

impl HttpRouter {
	pub fn router(&self) -> &Router {
		&self.router
	}
}

impl From<Router> for HttpRouter {
	fn from(router: Router) -> Self {
		Self {
			router: Arc::new(router),
		}
	}
}

impl From<Arc<Router>> for HttpRouter {
	fn from(router: Arc<Router>) -> Self {
		Self { router }
	}
}

impl<T> Service<T> for HttpRouter {
	type Response = RouteHandler;
	type Error = Infallible;
	type Future = Ready<Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, _: &mut Context) -> Poll<Result<(), Self::Error>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, _: T) -> Self::Future {
		ready(Ok(RouteHandler {
			router: Arc::clone(&self.router),
		}))
	}
}

/// Serves the requests of one connection.
#[derive(Clone)]
pub struct RouteHandler {
	router: Arc<Router>,
}

impl Service<Request<Body>> for RouteHandler {
	type Response = Response<Body>;
	type Error = Infallible;
	type Future = Ready<Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, req: Request<Body>) -> Self::Future {
		ready(Ok(self.router.dispatch(req)))
	}
}
