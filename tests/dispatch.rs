use anyhow::Result;
use std::sync::{Arc, Mutex};
use trellis::{
	from_fn,
	hyper::{
		body::to_bytes,
		header::{self, HeaderValue},
		Body, Request, Response, StatusCode,
	},
	Context, Controller, Error, ErrorCode, Handler, Middleware, Router, Scope,
};

type Log = Arc<Mutex<Vec<i32>>>;

#[derive(Clone)]
struct Mark {
	index: i32,
	stop_at: Option<i32>,
	log: Log,
}

impl Middleware for Mark {
	fn handle(&mut self, _ctx: &mut Context) -> Result<bool> {
		self.log.lock().unwrap().push(self.index);
		Ok(self.stop_at != Some(self.index))
	}
}

struct Marks {
	log: Log,
	stop_at: Option<i32>,
}

impl Marks {
	fn new(stop_at: Option<i32>) -> Self {
		Self {
			log: Log::default(),
			stop_at,
		}
	}

	fn mark(&self, index: i32) -> Mark {
		Mark {
			index,
			stop_at: self.stop_at,
			log: Arc::clone(&self.log),
		}
	}

	fn handler(&self) -> Handler {
		let log = Arc::clone(&self.log);
		Handler::func(move |_| {
			log.lock().unwrap().push(0);
			Ok(())
		})
	}

	fn taken(&self) -> Vec<i32> {
		std::mem::take(&mut *self.log.lock().unwrap())
	}
}

fn request(method: &str, uri: &str) -> Request<Body> {
	Request::builder()
		.method(method)
		.uri(uri)
		.body(Body::empty())
		.unwrap()
}

fn get(router: &Router, uri: &str) -> Response<Body> {
	router.dispatch(request("GET", uri))
}

fn echo(label: &'static str) -> Handler {
	Handler::func(move |ctx| {
		ctx.response
			.headers_mut()
			.insert("x-route", HeaderValue::from_static(label));
		Ok(())
	})
}

fn echoed(res: &Response<Body>) -> Option<&str> {
	res.headers().get("x-route").and_then(|v| v.to_str().ok())
}

fn location(res: &Response<Body>) -> Option<&str> {
	res.headers()
		.get(header::LOCATION)
		.and_then(|v| v.to_str().ok())
}

fn nested_groups(marks: &Marks) -> Result<Router> {
	let mut router = Router::new();
	router.use_middleware(marks.mark(1))?;
	router.use_middleware(marks.mark(2))?;

	let mut outer = router.group("/group")?;
	outer.use_middleware(marks.mark(11))?;
	outer.use_middleware_at(marks.mark(12), 1)?;

	let mut inner = outer.group("/group")?;
	inner.use_middleware_at(marks.mark(31), -1)?;
	inner.use_middleware_at(marks.mark(32), -1)?;
	inner
		.get("/route", marks.handler())?
		.use_middleware_at(marks.mark(41), -2)?
		.use_middleware_at(marks.mark(42), -1)?;

	Ok(router)
}

#[test]
fn nested_groups_order_middleware() -> Result<()> {
	let marks = Marks::new(None);
	let router = nested_groups(&marks)?;

	get(&router, "http://localhost/group/group/route");
	assert_eq!(marks.taken(), [12, 1, 2, 11, 0, 31, 32, 42, 41]);
	Ok(())
}

#[test]
fn nested_groups_built_with_closures() -> Result<()> {
	let marks = Marks::new(None);
	let mut router = Router::new();
	router.use_middleware(marks.mark(1))?;
	router.use_middleware(marks.mark(2))?;
	router.group_with("/group", |outer| {
		outer.use_middleware(marks.mark(11))?;
		outer.use_middleware_at(marks.mark(12), 1)?;
		outer.group_with("/group", |inner| {
			inner.use_middleware_at(marks.mark(31), -1)?;
			inner.use_middleware_at(marks.mark(32), -1)?;
			inner
				.get("/route", marks.handler())?
				.use_middleware_at(marks.mark(41), -2)?
				.use_middleware_at(marks.mark(42), -1)?;
			Ok(())
		})?;
		Ok(())
	})?;

	get(&router, "http://localhost/group/group/route");
	assert_eq!(marks.taken(), [12, 1, 2, 11, 0, 31, 32, 42, 41]);
	Ok(())
}

#[test]
fn middleware_stops_the_chain() -> Result<()> {
	let marks = Marks::new(Some(2));
	let router = nested_groups(&marks)?;
	get(&router, "http://localhost/group/group/route");
	assert_eq!(marks.taken(), [12, 1, 2]);

	let marks = Marks::new(Some(31));
	let router = nested_groups(&marks)?;
	get(&router, "http://localhost/group/group/route");
	assert_eq!(marks.taken(), [12, 1, 2, 11, 0, 31]);
	Ok(())
}

#[test]
fn middleware_priority_from_the_instance() -> Result<()> {
	#[derive(Clone)]
	struct Late(Log);

	impl Middleware for Late {
		fn handle(&mut self, _ctx: &mut Context) -> Result<bool> {
			self.0.lock().unwrap().push(-1);
			Ok(true)
		}

		fn priority(&self) -> i16 {
			-1
		}
	}

	let marks = Marks::new(None);
	let mut router = Router::new();
	router.use_middleware(Late(Arc::clone(&marks.log)))?;
	router.use_middleware(marks.mark(1))?;
	router.get("/", marks.handler())?;

	get(&router, "/");
	assert_eq!(marks.taken(), [1, 0, -1]);
	Ok(())
}

#[test]
fn shared_instance_keeps_its_first_position() -> Result<()> {
	let marks = Marks::new(None);
	let first = trellis::SharedMiddleware::new(marks.mark(1));

	let mut router = Router::new();
	router
		.get("/a", marks.handler())?
		.use_middleware(marks.mark(2))?
		.use_middleware(first.clone())?;
	router
		.get("/b", marks.handler())?
		.use_middleware(marks.mark(3))?
		.use_middleware(first)?;

	get(&router, "/a");
	assert_eq!(marks.taken(), [2, 1, 0]);
	get(&router, "/b");
	assert_eq!(marks.taken(), [1, 3, 0]);
	Ok(())
}

#[test]
fn middleware_at_every_level() -> Result<()> {
	let paths = Arc::new(Mutex::new(Vec::<String>::new()));
	let record = || {
		let paths = Arc::clone(&paths);
		from_fn(move |ctx: &mut Context| {
			paths.lock().unwrap().push(ctx.request.uri().path().to_owned());
			Ok(true)
		})
	};

	let mut router = Router::new();
	router.get("/", echo("/"))?;
	router
		.get("/route/middleware", echo("route"))?
		.use_middleware(record())?;
	let mut group = router.group("/group")?;
	group.get("/middleware", echo("group"))?;
	group.use_middleware(record())?;

	get(&router, "http://localhost/route/middleware");
	get(&router, "http://localhost/group/middleware/after_route");
	get(&router, "http://localhost/");

	assert_eq!(
		*paths.lock().unwrap(),
		["/route/middleware", "/group/middleware/after_route"]
	);
	Ok(())
}

#[test]
fn parent_middleware_reaches_existing_subgroups() -> Result<()> {
	let paths = Arc::new(Mutex::new(Vec::<String>::new()));
	let record = {
		let paths = Arc::clone(&paths);
		from_fn(move |ctx: &mut Context| {
			paths.lock().unwrap().push(ctx.request.uri().path().to_owned());
			Ok(true)
		})
	};

	let mut router = Router::new();
	let (outer, inner) = {
		let mut outer = router.group("/a")?;
		let inner = outer.group_with("/b", |inner| {
			inner.get("/c", echo("c"))?;
			Ok(())
		})?;
		let inner = inner.group_id();
		(outer.group_id(), inner)
	};
	router.group_mut(outer).unwrap().use_middleware(record)?;
	router.group_mut(inner).unwrap().get("/d", echo("d"))?;

	assert_eq!(echoed(&get(&router, "/a/b/c")), Some("c"));
	assert_eq!(echoed(&get(&router, "/a/b/d")), Some("d"));
	assert_eq!(*paths.lock().unwrap(), ["/a/b/c", "/a/b/d"]);
	Ok(())
}

#[test]
fn middleware_state_is_per_request() -> Result<()> {
	#[derive(Clone, Default)]
	struct Counter {
		hits: u32,
	}

	impl Middleware for Counter {
		fn handle(&mut self, ctx: &mut Context) -> Result<bool> {
			self.hits += 1;
			ctx.insert("hits", self.hits);
			Ok(true)
		}
	}

	let mut router = Router::new();
	router.use_middleware(Counter::default())?;
	router.get(
		"/",
		Handler::func(|ctx| {
			let hits = ctx.get::<u32>("hits").copied().unwrap_or_default();
			ctx.response
				.headers_mut()
				.insert("x-hits", HeaderValue::from(hits));
			Ok(())
		}),
	)?;

	for _ in 0..3 {
		let res = get(&router, "/");
		assert_eq!(res.headers()["x-hits"], "1");
	}
	Ok(())
}

#[test]
fn middleware_is_not_a_handler() {
	let mut router = Router::new();
	let result = router.get("/", Handler::middleware(from_fn(|_: &mut Context| Ok(true))));
	assert!(matches!(result, Err(Error::MiddlewareAsHandler(_))));
	assert!(router.is_empty());
}

#[test]
fn every_method_has_a_route() -> Result<()> {
	let methods = [
		"GET", "POST", "PUT", "DELETE", "OPTIONS", "HEAD", "PATCH", "CONNECT", "TRACE",
	];

	let mut router = Router::new();
	router.get("/", echo("GET"))?;
	router.post("/", echo("POST"))?;
	router.put("/", echo("PUT"))?;
	router.delete("/", echo("DELETE"))?;
	router.options("/", echo("OPTIONS"))?;
	router.head("/", echo("HEAD"))?;
	router.patch("/", echo("PATCH"))?;
	router.handle("CONNECT", "/", echo("CONNECT"))?;
	router.handle("trace", "/", echo("TRACE"))?;

	for method in methods.iter() {
		let res = router.dispatch(request(method, "http://localhost/"));
		assert_eq!(echoed(&res), Some(*method));
	}
	Ok(())
}

#[test]
fn any_serves_the_remaining_methods() -> Result<()> {
	let mut router = Router::new();
	router.get("/", echo("GET"))?;
	router.any("/", echo("*"))?;

	let res = router.dispatch(request("GET", "/"));
	assert_eq!(echoed(&res), Some("GET"));
	for method in ["POST", "DELETE", "PURGE"].iter() {
		let res = router.dispatch(request(method, "/"));
		assert_eq!(echoed(&res), Some("*"));
	}
	Ok(())
}

#[test]
fn some_methods_share_a_handler() -> Result<()> {
	let mut router = Router::new();
	router.some(&["GET", "POST"], "/", echo("GET_POST"))?;
	router.any("/", echo("*"))?;

	for (method, expected) in [("GET", "GET_POST"), ("POST", "GET_POST"), ("PUT", "*")].iter() {
		let res = router.dispatch(request(method, "/"));
		assert_eq!(echoed(&res), Some(*expected));
	}
	Ok(())
}

#[test]
fn duplicate_routes_are_rejected() -> Result<()> {
	let mut router = Router::new();
	router.get("/test", echo("first"))?;

	let err = router.get("/test", echo("second")).unwrap_err();
	assert_eq!(err.to_string(), "duplicate route 'GET /test'");

	router.get("host/test", echo("host"))?;
	router.post("/test", echo("post"))?;
	assert_eq!(router.len(), 3);
	assert_eq!(echoed(&get(&router, "/test")), Some("first"));
	Ok(())
}

fn priority_router() -> Result<Router> {
	let mut router = Router::new();
	router.handle_error(ErrorCode::NotFound, |_| {});

	router.get("/user", echo("/user"))?;
	router.get("/user/admin", echo("/user/admin"))?;
	router.get("/user/:name", echo("/user/:name"))?;
	router.get("/user/:name/", echo("/user/:name/"))?;
	router.get("/user/administrator", echo("/user/administrator"))?;
	router.get("host/user", echo("host/user"))?;
	router.get("host/user/admin/", echo("host/user/admin/"))?;
	router.get("host/user/:name", echo("host/user/:name"))?;
	router.get("host/user/:name/", echo("host/user/:name/"))?;
	Ok(router)
}

#[test]
fn routes_match_by_priority() -> Result<()> {
	let router = priority_router()?;

	let cases = [
		("/user", Some("/user")),
		("/user/", Some("/user")),
		("/user/admin", Some("/user/admin")),
		("/user/admin/", None),
		("/user/administrator", Some("/user/administrator")),
		("/user/adm", Some("/user/:name")),
		("/user/administ", Some("/user/:name")),
		("/user/test", Some("/user/:name")),
		("/user/test/", Some("/user/:name/")),
		("/user/adm/", Some("/user/:name/")),
	];
	for (path, expected) in cases.iter() {
		let res = get(&router, &format!("http://localhost{}", path));
		assert_eq!(echoed(&res), *expected, "requesting {}", path);
	}
	Ok(())
}

#[test]
fn host_routes_match_by_priority() -> Result<()> {
	let router = priority_router()?;

	let cases = [
		("host/user", "host/user"),
		("host/user/", "host/user"),
		("host/user/admin", "/user/admin"),
		("host/user/admin/", "host/user/admin/"),
		("host/user/administrator", "/user/administrator"),
		("host/user/adm", "host/user/:name"),
		("host/user/administ", "host/user/:name"),
		("host/user/test", "host/user/:name"),
		("host/user/adm/", "host/user/:name/"),
	];
	for (path, expected) in cases.iter() {
		let res = get(&router, &format!("http://{}", path));
		assert_eq!(echoed(&res), Some(*expected), "requesting {}", path);
	}
	Ok(())
}

#[test]
fn host_header_and_port() -> Result<()> {
	let mut router = Router::new();
	router.get("/user", echo("any"))?;
	router.get("example.com/user", echo("example"))?;

	let req = Request::get("/user")
		.header(header::HOST, "example.com:8080")
		.body(Body::empty())?;
	assert_eq!(echoed(&router.dispatch(req)), Some("example"));
	assert_eq!(echoed(&get(&router, "http://other.com/user")), Some("any"));
	Ok(())
}

#[test]
fn known_host_does_not_fall_back_on_method() -> Result<()> {
	let mut router = Router::new();
	router.post("/user", echo("any"))?;
	router.get("example.com/user", echo("example"))?;

	let res = router.dispatch(request("POST", "http://example.com/user"));
	assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
	let res = router.dispatch(request("POST", "http://other.com/user"));
	assert_eq!(echoed(&res), Some("any"));
	Ok(())
}

#[test]
fn lists_routes() -> Result<()> {
	let routes = [
		"/user POST",
		"/user GET",
		"host/user/:name PUT",
		"/user/admin GET",
		"/user/:name PUT",
		"host/user/admin PUT",
		"/user/admin PUT",
		"/user/:name GET",
		"/user/:name DELETE",
		"host/user POST",
		"host/user/:name DELETE",
	];

	let mut router = Router::new();
	for route in routes.iter() {
		let (pattern, method) = route.split_once(' ').unwrap();
		router.handle(method, pattern, echo("route"))?;
	}

	let list = router.routes();
	assert_eq!(list.len(), routes.len());
	for info in list.iter() {
		let key = format!("{}{} {}", info.host, info.pattern, info.method);
		assert!(routes.contains(&key.as_str()), "unexpected {}", key);
	}

	assert_eq!(
		list.to_string(),
		"GET         /user
POST        /user
DELETE      /user/:name
GET         /user/:name
PUT         /user/:name
GET         /user/admin
PUT         /user/admin
POST   host /user
DELETE host /user/:name
PUT    host /user/:name
PUT    host /user/admin
"
	);
	Ok(())
}

#[test]
fn redirects_to_the_trailing_slash() -> Result<()> {
	let mut router = Router::new();
	router.get("/user/", echo("/user/"))?;
	router.get("/user/:name/", echo("/user/:name/"))?;
	router.get("/user/admin/", echo("/user/admin/"))?;
	router.get("host/user/", echo("host/user/"))?;
	router.get("host/user/:name/", echo("host/user/:name/"))?;
	router.get("host/user/admin/", echo("host/user/admin/"))?;

	let cases = [
		("localhost/user", "http://localhost/user/"),
		("localhost/user/lwj", "http://localhost/user/lwj/"),
		("localhost/user/admin", "http://localhost/user/admin/"),
		("host/user", "http://host/user/"),
		("host/user/lwj", "http://host/user/lwj/"),
		("host/user/admin", "http://host/user/admin/"),
	];
	for (path, expected) in cases.iter() {
		let res = get(&router, &format!("http://{}", path));
		assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT, "requesting {}", path);
		assert_eq!(location(&res), Some(*expected));
	}

	// redirects happen before the method is checked
	let res = router.dispatch(request("POST", "/user"));
	assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
	assert_eq!(location(&res), Some("/user/"));
	Ok(())
}

#[test]
fn redirects_to_the_clean_path() -> Result<()> {
	let mut router = Router::new();
	router.get("/a/b", echo("/a/b"))?;

	let res = get(&router, "/a//b");
	assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
	assert_eq!(location(&res), Some("/a/b"));

	let res = get(&router, "http://localhost/a/x/../b?page=2");
	assert_eq!(location(&res), Some("http://localhost/a/b?page=2"));

	let res = get(&router, "/a/./b");
	assert_eq!(location(&res), Some("/a/b"));
	Ok(())
}

#[test]
fn asterisk_is_a_bad_request() {
	let router = Router::new();
	let res = router.dispatch(request("OPTIONS", "*"));
	assert_eq!(res.status(), StatusCode::BAD_REQUEST);
	assert_eq!(res.headers()[header::CONNECTION], "close");
}

#[tokio::test]
async fn default_error_responses() -> Result<()> {
	let mut router = Router::new();
	router.get("/test", echo("test"))?;

	let res = get(&router, "/missing");
	assert_eq!(res.status(), StatusCode::NOT_FOUND);
	assert_eq!(
		res.headers()[header::CONTENT_TYPE],
		"text/plain; charset=utf-8"
	);
	assert_eq!(res.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
	assert_eq!(to_bytes(res.into_body()).await?, "404 route not found\n");

	let res = router.dispatch(request("POST", "/test"));
	assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
	assert_eq!(to_bytes(res.into_body()).await?, "405 method not allowed\n");
	Ok(())
}

#[test]
fn error_hooks_replace_default_responses() -> Result<()> {
	let fired = Arc::new(Mutex::new(Vec::<u16>::new()));
	let hook = |label: u16| {
		let fired = Arc::clone(&fired);
		move |ctx: &mut Context| {
			fired.lock().unwrap().push(label);
			let status = ctx.response.status().as_u16();
			ctx.response
				.headers_mut()
				.insert("x-status", HeaderValue::from(status));
		}
	};

	let mut router = Router::new();
	router
		.handle_error(ErrorCode::NotFound, hook(404))
		.handle_error(ErrorCode::MethodNotAllowed, hook(405))
		.handle_error(ErrorCode::InternalError, hook(500));
	router.get("/test", echo("test"))?;
	router.get("/panic", Handler::func(|_| panic!("trigger 500")))?;

	let res = get(&router, "/test404");
	assert_eq!(res.status(), StatusCode::NOT_FOUND);
	assert_eq!(res.headers()["x-status"], "404");
	router.dispatch(request("POST", "/test"));
	get(&router, "/panic");

	assert_eq!(*fired.lock().unwrap(), [404, 405, 500]);
	Ok(())
}

#[tokio::test]
async fn panicking_error_hooks_fall_back() -> Result<()> {
	let mut router = Router::new();
	router.handle_error(ErrorCode::NotFound, |_| panic!("not found hook"));
	router.get("/ok", echo("ok"))?;

	let res = get(&router, "/missing");
	assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(to_bytes(res.into_body()).await?, "500 internal server error\n");

	router.handle_error(ErrorCode::InternalError, |ctx| {
		ctx.response
			.headers_mut()
			.insert("x-hook", HeaderValue::from_static("500"));
	});
	assert_eq!(get(&router, "/missing").headers()["x-hook"], "500");

	router.handle_error(ErrorCode::InternalError, |_| panic!("internal error hook"));
	let res = get(&router, "/missing");
	assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert!(res.headers().get("x-hook").is_none());
	assert_eq!(to_bytes(res.into_body()).await?, "500 internal server error\n");

	assert_eq!(echoed(&get(&router, "/ok")), Some("ok"));
	Ok(())
}

#[test]
fn method_not_allowed_hook_sees_params() -> Result<()> {
	let mut router = Router::new();
	router.handle_error(ErrorCode::MethodNotAllowed, |ctx| {
		let name = ctx.param("name").unwrap_or_default().to_owned();
		if let Ok(name) = HeaderValue::from_str(&name) {
			ctx.response.headers_mut().insert("x-name", name);
		}
	});
	router.get("/user/:name", echo("user"))?;

	let res = router.dispatch(request("POST", "/user/bob"));
	assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
	assert_eq!(res.headers()["x-name"], "bob");
	Ok(())
}

#[tokio::test]
async fn failures_become_internal_errors() -> Result<()> {
	let mut router = Router::new();
	router.get("/panic", Handler::func(|_| panic!("boom")))?;
	router.get("/fail", Handler::func(|_| Err(anyhow::anyhow!("failed"))))?;
	router.get("/ok", echo("ok"))?;

	for path in ["/panic", "/fail"].iter() {
		let res = get(&router, path);
		assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(echoed(&res), None);
		assert_eq!(to_bytes(res.into_body()).await?, "500 internal server error\n");
	}

	assert_eq!(echoed(&get(&router, "/ok")), Some("ok"));
	Ok(())
}

#[test]
fn native_handlers_build_the_response() -> Result<()> {
	let mut router = Router::new();
	router.get(
		"/native",
		Handler::native(|req: &Request<Body>| {
			Ok(Response::builder()
				.status(StatusCode::CREATED)
				.header("x-path", req.uri().path())
				.body(Body::empty())?)
		}),
	)?;

	let res = get(&router, "/native");
	assert_eq!(res.status(), StatusCode::CREATED);
	assert_eq!(res.headers()["x-path"], "/native");
	Ok(())
}

#[derive(Clone)]
struct Profiles {
	prefix: &'static str,
	name: String,
}

impl Controller for Profiles {
	fn initialize(&mut self, ctx: &mut Context) {
		self.name = ctx.param("name").unwrap_or_default().to_owned();
	}

	fn finalize(&mut self, ctx: &mut Context) {
		ctx.response
			.headers_mut()
			.insert("x-finalized", HeaderValue::from_static("yes"));
	}
}

impl Profiles {
	fn show(&mut self, ctx: &mut Context) -> Result<()> {
		ctx.response = Response::new(Body::from(format!("{}{}", self.prefix, self.name)));
		Ok(())
	}
}

#[tokio::test]
async fn controllers_run_on_fresh_copies() -> Result<()> {
	let mut router = Router::new();
	router.register_controller(Profiles {
		prefix: "profile of ",
		name: String::new(),
	});
	router.get("/profile/:name", Handler::action(Profiles::show))?;

	for name in ["bob", "alice"].iter() {
		let res = get(&router, &format!("/profile/{}", name));
		assert_eq!(res.headers()["x-finalized"], "yes");
		let body = to_bytes(res.into_body()).await?;
		assert_eq!(body, format!("profile of {}", name).as_bytes());
	}
	Ok(())
}

#[test]
fn unregistered_controllers_are_rejected() {
	let mut router = Router::new();
	let result = router.get("/profile/:name", Handler::action(Profiles::show));
	assert!(matches!(result, Err(Error::UnregisteredController(_))));
}
