use anyhow::Result;
use trellis::{
	from_fn,
	hyper::{header, Body, Response, Server, StatusCode},
	Context, Controller, ErrorCode, Handler, HttpRouter, Middleware, Router, Scope,
};

/// Logs every request it sees, after the main handler has run.
#[derive(Clone, Default)]
struct AccessLog;

impl Middleware for AccessLog {
	fn handle(&mut self, ctx: &mut Context) -> Result<bool> {
		tracing::info!(
			method = %ctx.request.method(),
			path = ctx.request.uri().path(),
			status = %ctx.response.status(),
			"served"
		);
		Ok(true)
	}

	fn priority(&self) -> i16 {
		-1
	}
}

#[derive(Clone)]
struct Users {
	greeting: &'static str,
}

impl Controller for Users {}

impl Users {
	fn show(&mut self, ctx: &mut Context) -> Result<()> {
		let body = format!("{} {}\n", self.greeting, ctx.param("name").unwrap_or_default());
		ctx.response = Response::new(Body::from(body));
		Ok(())
	}
}

fn text(body: &'static str) -> Handler {
	Handler::func(move |ctx| {
		ctx.response = Response::new(Body::from(body));
		Ok(())
	})
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.init();

	let addr = ([127, 0, 0, 1], 3000).into();

	let mut router = Router::new();
	router.register_controller(Users { greeting: "hello" });
	router.handle_error(ErrorCode::NotFound, |ctx| {
		*ctx.response.body_mut() = Body::from("nothing here\n");
	});
	router.use_middleware(AccessLog)?;

	router.get("/", text("index\n"))?;
	router.get("/static/", text("static files\n"))?;
	router.group_with("/user", |users| {
		users.use_middleware(from_fn(|ctx: &mut Context| {
			if ctx.request.headers().contains_key(header::AUTHORIZATION) {
				return Ok(true);
			}
			*ctx.response.status_mut() = StatusCode::UNAUTHORIZED;
			Ok(false)
		}))?;
		users.get("/:name", Handler::action(Users::show))?;
		users.delete("/:name", text("deleted\n"))?;
		Ok(())
	})?;

	println!("{}", router.routes());

	let server = Server::bind(&addr).serve(HttpRouter::from(router));
	println!("Listening on http://{}", addr);

	server.await?;
	Ok(())
}
