//! Classpath assembly and command construction for the MultiLangDaemon
//! launcher. String plumbing only; the daemon itself owns everything that
//! happens after the spawn.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const MULTI_LANG_DAEMON_CLASS: &str =
    "com.amazonaws.services.kinesis.multilang.MultiLangDaemon";

/// Names the jar directory for the launcher itself; never emitted into a
/// generated properties file.
pub const JAR_DIR_VAR: &str = "KCL_JAR_DIR";

const PROPERTY_VAR_PREFIX: &str = "KCL_";

fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

/// The `.jar` files directly inside `jar_dir`, sorted so the classpath is
/// deterministic.
pub fn kcl_jars(jar_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut jars = Vec::new();
    for entry in fs::read_dir(jar_dir)? {
        let path = entry?.path();
        if path.extension().map(|ext| ext == "jar").unwrap_or(false) {
            jars.push(path);
        }
    }
    jars.sort();
    Ok(jars)
}

/// Builds the daemon classpath: user-supplied paths first (so users can
/// shadow bundled classes), then the KCL jars, then the directory holding
/// the properties file.
pub fn kcl_classpath(
    jar_dir: &Path,
    properties: Option<&Path>,
    extra_paths: &[PathBuf],
) -> io::Result<String> {
    let mut entries = Vec::new();
    for path in extra_paths {
        entries.push(absolute(path)?);
    }
    entries.extend(kcl_jars(&absolute(jar_dir)?)?);
    if let Some(properties) = properties {
        if let Some(dir) = absolute(properties)?.parent() {
            entries.push(dir.to_path_buf());
        }
    }

    let entries: Vec<String> = entries
        .iter()
        .map(|path| path.display().to_string())
        .filter(|entry| !entry.is_empty())
        .collect();
    Ok(entries.join(":"))
}

/// Everything needed to assemble a MultiLangDaemon invocation.
pub struct DaemonCommand {
    pub java: PathBuf,
    pub jar_dir: PathBuf,
    pub properties: PathBuf,
    pub java_loglevel_properties: Option<PathBuf>,
    pub extra_paths: Vec<PathBuf>,
}

impl DaemonCommand {
    pub fn argv(&self) -> io::Result<Vec<String>> {
        let classpath = kcl_classpath(&self.jar_dir, Some(&self.properties), &self.extra_paths)?;
        let mut argv = vec![
            self.java.display().to_string(),
            "-cp".to_owned(),
            classpath,
        ];
        if let Some(loglevel) = &self.java_loglevel_properties {
            argv.push(format!(
                "-Djava.util.logging.config.file={}",
                loglevel.display()
            ));
        }
        argv.push(MULTI_LANG_DAEMON_CLASS.to_owned());
        // Basename only: the properties directory is already on the
        // classpath.
        argv.push(
            self.properties
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.properties.display().to_string()),
        );
        Ok(argv)
    }
}

/// `STREAM_NAME` becomes `streamName`.
fn property_key(var: &str) -> String {
    let mut key = String::new();
    for (i, part) in var.split('_').enumerate() {
        let part = part.to_ascii_lowercase();
        if i == 0 {
            key.push_str(&part);
        } else {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                key.push(first.to_ascii_uppercase());
                key.extend(chars);
            }
        }
    }
    key
}

/// Writes a Java properties file assembled from `KCL_`-prefixed environment
/// variables (`KCL_STREAM_NAME` becomes `streamName`), sorted by key.
/// Returns the number of properties written.
pub fn generate_properties_from_env(path: &Path) -> io::Result<usize> {
    let mut properties: Vec<(String, String)> = env::vars()
        .filter(|(name, _)| name != JAR_DIR_VAR)
        .filter_map(|(name, value)| {
            name.strip_prefix(PROPERTY_VAR_PREFIX)
                .map(|rest| (property_key(rest), value))
        })
        .collect();
    properties.sort();

    let mut file = fs::File::create(path)?;
    for (key, value) in &properties {
        writeln!(file, "{} = {}", key, value)?;
    }
    Ok(properties.len())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn jars_are_discovered_and_sorted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.jar"), b"").unwrap();
        fs::write(dir.path().join("a.jar"), b"").unwrap();
        fs::write(dir.path().join("README.txt"), b"").unwrap();

        let jars = kcl_jars(dir.path()).unwrap();
        assert_eq!(
            jars,
            vec![dir.path().join("a.jar"), dir.path().join("b.jar")]
        );
    }

    #[test]
    fn classpath_puts_user_paths_before_the_jars() {
        let jars = tempdir().unwrap();
        fs::write(jars.path().join("kcl.jar"), b"").unwrap();
        let props_dir = tempdir().unwrap();
        let properties = props_dir.path().join("consumer.properties");
        fs::write(&properties, b"").unwrap();

        let classpath = kcl_classpath(
            jars.path(),
            Some(&properties),
            &[PathBuf::from("/opt/consumer/lib")],
        )
        .unwrap();

        assert_eq!(
            classpath,
            format!(
                "/opt/consumer/lib:{}:{}",
                jars.path().join("kcl.jar").display(),
                props_dir.path().display()
            )
        );
    }

    #[test]
    fn daemon_argv_includes_loglevel_and_properties_basename() {
        let jars = tempdir().unwrap();
        fs::write(jars.path().join("kcl.jar"), b"").unwrap();
        let props_dir = tempdir().unwrap();
        let properties = props_dir.path().join("consumer.properties");
        fs::write(&properties, b"").unwrap();

        let command = DaemonCommand {
            java: PathBuf::from("/usr/bin/java"),
            jar_dir: jars.path().to_path_buf(),
            properties,
            java_loglevel_properties: Some(PathBuf::from("/etc/logging.properties")),
            extra_paths: Vec::new(),
        };
        let argv = command.argv().unwrap();

        assert_eq!(argv[0], "/usr/bin/java");
        assert_eq!(argv[1], "-cp");
        assert_eq!(
            argv[3],
            "-Djava.util.logging.config.file=/etc/logging.properties"
        );
        assert_eq!(argv[4], MULTI_LANG_DAEMON_CLASS);
        assert_eq!(argv[5], "consumer.properties");
    }

    #[test]
    fn property_keys_are_camel_cased() {
        assert_eq!(property_key("STREAM_NAME"), "streamName");
        assert_eq!(property_key("APPLICATION_NAME"), "applicationName");
        assert_eq!(
            property_key("IDLE_TIME_BETWEEN_READS_IN_MILLIS"),
            "idleTimeBetweenReadsInMillis"
        );
    }

    #[test]
    fn properties_file_is_generated_from_the_environment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("generated.properties");
        env::set_var("KCL_GEN_TEST_STREAM_NAME", "clickstream");
        env::set_var("KCL_GEN_TEST_APPLICATION_NAME", "consumer");
        env::set_var(JAR_DIR_VAR, "/opt/kcl/jars");

        let count = generate_properties_from_env(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();

        env::remove_var("KCL_GEN_TEST_STREAM_NAME");
        env::remove_var("KCL_GEN_TEST_APPLICATION_NAME");
        env::remove_var(JAR_DIR_VAR);

        assert!(count >= 2);
        assert!(contents.contains("genTestStreamName = clickstream"));
        assert!(contents.contains("genTestApplicationName = consumer"));
        assert!(!contents.contains("jarDir"));
    }
}
