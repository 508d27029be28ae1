//! Runtime tuning knobs.

use std::path::PathBuf;

/// Behaviour switches shared by every resolver of a runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Walk the plugin graph before asking the root resolver.
    pub probe_root_last: bool,
    /// Try a plugin's own libraries first for namespaces it already
    /// provided.
    pub local_fast_path: bool,
    /// Consult the namespace owner cache during graph walks.
    pub foreign_fast_path: bool,
    /// Namespace prefixes owned by the host platform. Illegal names under
    /// them go straight to the root resolver.
    pub platform_namespaces: Vec<String>,
    /// Exact names under a platform namespace that still go through the
    /// plugin graph.
    pub platform_exceptions: Vec<String>,
    /// Suffix of adapter metadata names; a name ending with it is only legal
    /// when the suffix is a whole segment.
    pub metadata_suffix: String,
    /// Appended to the slash-separated class name to form a library entry.
    pub class_entry_suffix: String,
    /// Owner count past which a namespace split is reported.
    pub owner_warn_threshold: usize,
    /// Native library cache placement.
    pub native_cache: NativeCacheSettings,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            probe_root_last: false,
            local_fast_path: true,
            foreign_fast_path: true,
            platform_namespaces: vec!["java".to_owned()],
            platform_exceptions: vec!["java.lang.ObjectBeanInfo".to_owned()],
            metadata_suffix: "BeanInfo".to_owned(),
            class_entry_suffix: ".class".to_owned(),
            owner_warn_threshold: 3,
            native_cache: NativeCacheSettings::default(),
        }
    }
}

impl ResolverSettings {
    /// Whether `name` can never be resolved through the plugin graph.
    ///
    /// That is the case for names without a namespace and for names that
    /// end with the metadata suffix without it being a segment of its own.
    #[must_use]
    pub fn is_illegal_name(&self, name: &str) -> bool {
        if !name.contains('.') {
            return true;
        }
        if self.metadata_suffix.is_empty() {
            return false;
        }
        name.strip_suffix(self.metadata_suffix.as_str())
            .is_some_and(|stem| !stem.ends_with('.'))
    }

    /// Whether `name` falls under a host platform namespace and is not one
    /// of the platform exceptions.
    #[must_use]
    pub fn is_platform_name(&self, name: &str) -> bool {
        self.platform_namespaces
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
            && !self.platform_exceptions.iter().any(|n| n == name)
    }
}

/// Where native libraries are copied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCacheSettings {
    /// Copy remote native libraries at all.
    pub enabled: bool,
    /// Parent of the cache folder. Defaults to the OS temp directory.
    pub base_dir: Option<PathBuf>,
    /// Suffix of the generated folder name.
    pub folder_suffix: String,
    /// Fixed folder name, replacing the timestamp-qualified default.
    pub folder_name: Option<String>,
    /// Name of the sentinel lock file inside the folder.
    pub lock_file_name: String,
}

impl Default for NativeCacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_dir: None,
            folder_suffix: ".plexus-lib-cache".to_owned(),
            folder_name: None,
            lock_file_name: "lock".to_owned(),
        }
    }
}

impl NativeCacheSettings {
    /// Directory the cache folder is created in.
    #[must_use]
    pub fn base_dir(&self) -> PathBuf {
        self.base_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Cache folder name: the fixed name if set, else
    /// `{unix_millis}{folder_suffix}`.
    #[must_use]
    pub fn folder_name(&self) -> String {
        self.folder_name.clone().unwrap_or_else(|| {
            format!(
                "{}{}",
                chrono::Utc::now().timestamp_millis(),
                self.folder_suffix
            )
        })
    }
}

#[cfg(feature = "config")]
impl From<&plexus_config::Config> for ResolverSettings {
    fn from(config: &plexus_config::Config) -> Self {
        let r = &config.resolver;
        let n = &config.native_cache;
        Self {
            probe_root_last: r.probe_root_last,
            local_fast_path: r.local_fast_path,
            foreign_fast_path: r.foreign_fast_path,
            platform_namespaces: r.platform_namespaces.clone(),
            platform_exceptions: r.platform_exceptions.clone(),
            metadata_suffix: r.metadata_suffix.clone(),
            class_entry_suffix: r.class_entry_suffix.clone(),
            owner_warn_threshold: r.owner_warn_threshold,
            native_cache: NativeCacheSettings {
                enabled: n.enabled,
                base_dir: n.base_dir.as_ref().map(PathBuf::from),
                folder_suffix: n.folder_suffix.clone(),
                folder_name: n.folder_name.clone(),
                lock_file_name: n.lock_file_name.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_names() {
        let s = ResolverSettings::default();
        assert!(s.is_illegal_name("Widget"));
        assert!(s.is_illegal_name("com.acme.WidgetBeanInfo"));
        assert!(s.is_illegal_name("WidgetBeanInfo"));
        assert!(!s.is_illegal_name("com.acme.BeanInfo"));
        assert!(!s.is_illegal_name("com.acme.Widget"));
    }

    #[test]
    fn platform_names_match_by_prefix() {
        let s = ResolverSettings::default();
        assert!(s.is_platform_name("java.lang.String"));
        assert!(s.is_platform_name("javax.swing.JPanelBeanInfo"));
        assert!(!s.is_platform_name("com.acme.Widget"));
    }

    #[test]
    fn platform_exceptions_are_not_platform_names() {
        let s = ResolverSettings::default();
        assert!(s.is_illegal_name("java.lang.ObjectBeanInfo"));
        assert!(!s.is_platform_name("java.lang.ObjectBeanInfo"));
        assert!(s.is_platform_name("java.lang.StringBeanInfo"));
    }

    #[test]
    fn fixed_folder_name_wins() {
        let n = NativeCacheSettings {
            folder_name: Some("libs".to_owned()),
            ..NativeCacheSettings::default()
        };
        assert_eq!(n.folder_name(), "libs");
        assert!(NativeCacheSettings::default().folder_name().ends_with(".plexus-lib-cache"));
    }

    #[cfg(feature = "config")]
    #[test]
    fn defaults_agree_with_config_defaults() {
        let from_config = ResolverSettings::from(&plexus_config::Config::default());
        assert_eq!(from_config, ResolverSettings::default());
    }

    #[cfg(feature = "config")]
    #[test]
    fn config_sections_are_mapped() {
        let mut config = plexus_config::Config::default();
        config.resolver.probe_root_last = true;
        config.resolver.platform_namespaces = vec!["java".to_owned(), "sun".to_owned()];
        config.native_cache.base_dir = Some("/var/cache/plexus".to_owned());
        config.native_cache.enabled = false;

        let settings = ResolverSettings::from(&config);

        assert!(settings.probe_root_last);
        assert!(settings.is_platform_name("sun.misc.Unsafe"));
        assert!(!settings.native_cache.enabled);
        assert_eq!(settings.native_cache.base_dir(), PathBuf::from("/var/cache/plexus"));
    }
}
