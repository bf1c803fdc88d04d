// SPDX-License-Identifier: Apache-2.0

// Pre-build code for the osal crate.
//
// This makes the values from a Kconfig-style `.config` file available as conditional compilation
// and as constants.  A build script calls these functions, which print cargo directives and write
// generated code into OUT_DIR.
//
// The file is named by the `DOTCONFIG` environment variable.  When unset, the crate's own
// `osal.conf` is used.

use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use regex::Regex;

/// Name of the configuration file used when `DOTCONFIG` is not set.
pub const DEFAULT_CONFIG: &str = "osal.conf";

/// Locate the configuration file, and make sure the build script reruns when it changes.
pub fn dotconfig() -> PathBuf {
    println!("cargo:rerun-if-env-changed=DOTCONFIG");
    let path = match env::var_os("DOTCONFIG") {
        Some(path) => PathBuf::from(path),
        None => {
            let dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set");
            Path::new(&dir).join(DEFAULT_CONFIG)
        }
    };
    println!("cargo:rerun-if-changed={}", path.display());
    path
}

/// Export boolean Kconfig entries.  This must happen in any crate that wishes to access the
/// configuration settings.
pub fn export_bool_kconfig() {
    let dotconfig = dotconfig();
    let file = File::open(&dotconfig).expect("Unable to open dotconfig");
    for name in bool_entries(BufReader::new(file)) {
        println!("cargo:rustc-cfg={}", name);
    }
}

/// Capture numeric and string kconfig values in a 'kconfig' module.
/// This is a little simplistic, and will make the entries numeric if they look like numbers.
pub fn build_kconfig_mod() {
    let dotconfig = dotconfig();
    let outdir = env::var("OUT_DIR").expect("OUT_DIR must be set");
    let gen_path = Path::new(&outdir).join("kconfig.rs");

    let file = File::open(&dotconfig).expect("Unable to open dotconfig");
    let mut f = File::create(&gen_path).expect("Unable to create kconfig.rs");
    write_kconfig_mod(BufReader::new(file), &mut f).expect("Writing kconfig.rs");
}

/// Names of the `CONFIG_X=y` entries.
pub fn bool_entries<R: BufRead>(input: R) -> Vec<String> {
    let config_y = Regex::new(r"^(CONFIG_[A-Za-z0-9_]*)=y$").unwrap();
    input
        .lines()
        .map(|line| line.expect("reading line from dotconfig"))
        .filter_map(|line| config_y.captures(&line).map(|caps| caps[1].to_string()))
        .collect()
}

/// Write the constants for the numeric and string entries of `input`.
pub fn write_kconfig_mod<R: BufRead, W: Write>(input: R, out: &mut W) -> std::io::Result<()> {
    // The assumption is that hex values are unsigned, and decimal are signed.
    let config_hex = Regex::new(r"^(CONFIG_[A-Za-z0-9_]*)=(0x[0-9a-fA-F]+)$").unwrap();
    let config_int = Regex::new(r"^(CONFIG_[A-Za-z0-9_]*)=(-?(0|[1-9][0-9]*))$").unwrap();
    let config_str = Regex::new(r#"^(CONFIG_[A-Za-z0-9_]*)=(".*")$"#).unwrap();

    for line in input.lines() {
        let line = line?;
        if let Some(caps) = config_hex.captures(&line) {
            writeln!(out, "#[allow(dead_code)]")?;
            writeln!(out, "pub const {}: usize = {};", &caps[1], &caps[2])?;
        } else if let Some(caps) = config_int.captures(&line) {
            writeln!(out, "#[allow(dead_code)]")?;
            writeln!(out, "pub const {}: isize = {};", &caps[1], &caps[2])?;
        } else if let Some(caps) = config_str.captures(&line) {
            writeln!(out, "#[allow(dead_code)]")?;
            writeln!(out, "pub const {}: &'static str = {};", &caps[1], &caps[2])?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Comment
CONFIG_PRINTK=y
CONFIG_OSAL_LOG_LEVEL=3
CONFIG_OFFSET=-2
CONFIG_MASK=0xff
CONFIG_NAME=\"host\"
# CONFIG_UNSET is not set
";

    #[test]
    fn bools_become_cfgs() {
        assert_eq!(bool_entries(SAMPLE.as_bytes()), vec!["CONFIG_PRINTK".to_string()]);
    }

    #[test]
    fn values_become_constants() {
        let mut out = Vec::new();
        write_kconfig_mod(SAMPLE.as_bytes(), &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("pub const CONFIG_OSAL_LOG_LEVEL: isize = 3;"));
        assert!(out.contains("pub const CONFIG_OFFSET: isize = -2;"));
        assert!(out.contains("pub const CONFIG_MASK: usize = 0xff;"));
        assert!(out.contains("pub const CONFIG_NAME: &'static str = \"host\";"));
        assert!(!out.contains("CONFIG_PRINTK"));
    }
}
