//! Running package install/uninstall hook scripts.

use std::path::Path;
use std::process::Command;

/// How running instances of a package may be closed before removal.
/// Flags combine with `|`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseFlags(u32);

impl CloseFlags {
	pub const NONE: CloseFlags = CloseFlags(0);
	/// Politely ask open windows to close.
	pub const CLOSE_WINDOWS: CloseFlags = CloseFlags(1);
	/// Terminate remaining processes.
	pub const KILL_PROCESSES: CloseFlags = CloseFlags(2);

	pub fn contains(self, other: CloseFlags) -> bool {
		self.0 & other.0 == other.0
	}

	pub fn bits(self) -> u32 {
		self.0
	}
}

impl std::ops::BitOr for CloseFlags {
	type Output = CloseFlags;
	fn bitor(self, rhs: CloseFlags) -> CloseFlags {
		CloseFlags(self.0 | rhs.0)
	}
}

/// What a hook reported back.
#[derive(Debug, Clone)]
pub struct HookOutput {
	pub exit_code: i32,
	pub output: String,
}

impl HookOutput {
	fn empty() -> Self {
		Self { exit_code: 0, output: String::new() }
	}
}

/// Executes package lifecycle hooks. The executor does not care how a
/// hook runs, only whether it succeeded and what it printed.
pub trait HookRunner {
	fn run_install_hook(&self, dir: &Path, env: &[(String, String)]) -> crate::Result<HookOutput>;

	fn run_uninstall_hook(&self, dir: &Path, env: &[(String, String)]) -> crate::Result<HookOutput>;

	/// Stops running instances of the package installed in `dir` before removal.
	fn stop_running_instances(&self, dir: &Path, close: CloseFlags) -> crate::Result<()>;
}

/// Runs `.depot/install`, `.depot/uninstall` and `.depot/stop` scripts
/// from the package directory. A package without a script for a stage
/// simply has nothing to do there.
#[derive(Debug, Default)]
pub struct ScriptHookRunner {
	/// Echo hook output to the process stdout.
	pub print_script_output: bool,
}

#[cfg(target_os = "windows")]
fn script_path(dir: &Path, name: &str) -> std::path::PathBuf {
	dir.join(".depot").join(format!("{}.bat", name))
}

#[cfg(not(target_os = "windows"))]
fn script_path(dir: &Path, name: &str) -> std::path::PathBuf {
	dir.join(".depot").join(format!("{}.sh", name))
}

impl ScriptHookRunner {
	fn run_script(&self, dir: &Path, name: &str, env: &[(String, String)]) -> crate::Result<HookOutput> {
		let script = script_path(dir, name);
		if !script.exists() {
			log::debug!("No {} hook in {}", name, dir.display());
			return Ok(HookOutput::empty());
		}

		log::info!("Running {} hook in {}", name, dir.display());

		#[cfg(target_os = "windows")]
		let mut command = {
			let mut c = Command::new("cmd");
			c.arg("/C").arg(&script);
			c
		};

		#[cfg(not(target_os = "windows"))]
		let mut command = {
			let mut c = Command::new("sh");
			c.arg(&script);
			c
		};

		command.current_dir(dir);
		for (key, value) in env {
			command.env(key, value);
		}

		let result = command.output()?;
		let mut output = String::from_utf8_lossy(&result.stdout).to_string();
		output.push_str(&String::from_utf8_lossy(&result.stderr));

		if self.print_script_output && !output.is_empty() {
			println!("{}", output.trim_end());
		}

		let exit_code = result.status.code().unwrap_or(-1);
		if !result.status.success() {
			return Err(crate::Error::Script(
				format!("{} exited with code {}: {}", script.display(), exit_code, output.trim())
			));
		}

		Ok(HookOutput { exit_code, output })
	}
}

impl HookRunner for ScriptHookRunner {
	fn run_install_hook(&self, dir: &Path, env: &[(String, String)]) -> crate::Result<HookOutput> {
		self.run_script(dir, "install", env)
	}

	fn run_uninstall_hook(&self, dir: &Path, env: &[(String, String)]) -> crate::Result<HookOutput> {
		self.run_script(dir, "uninstall", env)
	}

	fn stop_running_instances(&self, dir: &Path, close: CloseFlags) -> crate::Result<()> {
		let env = [("DEPOT_CLOSE_TYPE".to_string(), close.bits().to_string())];
		self.run_script(dir, "stop", &env)?;
		Ok(())
	}
}
