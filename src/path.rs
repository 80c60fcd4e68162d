/// Returns the canonical absolute form of a request path: `.` and `..` resolved, repeated slashes
/// collapsed. A trailing slash is kept.
pub fn clean_path(path: &str) -> String {
	if path.is_empty() {
		return "/".to_owned();
	}

	let mut segments: Vec<&str> = vec![];
	for segment in path.split('/') {
		match segment {
			"" | "." => {}
			".." => {
				segments.pop();
			}
			segment => segments.push(segment),
		}
	}

	let mut clean = String::with_capacity(path.len() + 1);
	for segment in &segments {
		clean.push('/');
		clean.push_str(segment);
	}
	if clean.is_empty() || path.ends_with('/') {
		clean.push('/');
	}
	clean
}

/// Removes a trailing `:port` from a host.
pub fn strip_host_port(host: &str) -> &str {
	if let Some(rest) = host.strip_prefix('[') {
		// [::1]:8080
		return match rest.split_once("]:") {
			Some((ip, _)) => ip,
			None => host,
		};
	}

	match host.split_once(':') {
		Some((name, port)) if !port.contains(':') => name,
		_ => host,
	}
}

#[cfg(test)]
mod test {
	use super::{clean_path, strip_host_port};

	#[test]
	fn cleans_paths() {
		let cases = [
			("", "/"),
			("/", "/"),
			("user", "/user"),
			("/user", "/user"),
			("/user/", "/user/"),
			("//user///profile", "/user/profile"),
			("/user/./profile", "/user/profile"),
			("/user/profile/..", "/user"),
			("/user/profile/../", "/user/"),
			("/user/.", "/user"),
			("/..", "/"),
			("/../", "/"),
			("/a/b/../../../c", "/c"),
		];
		for (path, clean) in cases.iter() {
			assert_eq!(clean_path(path), *clean, "cleaning {:?}", path);
		}
	}

	#[test]
	fn strips_ports() {
		assert_eq!(strip_host_port("example.com"), "example.com");
		assert_eq!(strip_host_port("example.com:8080"), "example.com");
		assert_eq!(strip_host_port("[::1]:8080"), "::1");
		assert_eq!(strip_host_port("[::1]"), "[::1]");
		assert_eq!(strip_host_port("::1"), "::1");
	}
}
