/// Per entity type configuration
///
/// Similar to a table mapping in other Active Record layers
#[derive(Debug, Clone)]
pub struct EntityConfig {
    /// Storage (table/collection) name; inferred from the type name when unset
    pub storage_name: Option<String>,

    /// Name of the property that exposes the record identity
    pub id_property: String,

    /// Whether undeclared schemas may be discovered from the backend
    pub discover_fields: bool,
}

impl EntityConfig {
    pub fn new() -> Self {
        Self {
            storage_name: None,
            id_property: "id".to_string(),
            discover_fields: true,
        }
    }

    /// Set the storage name
    pub fn storage_name(mut self, storage_name: &str) -> Self {
        self.storage_name = Some(storage_name.to_string());
        self
    }

    /// Set the identity property name
    pub fn id_property(mut self, id_property: &str) -> Self {
        self.id_property = id_property.to_string();
        self
    }

    /// Allow or forbid backend field discovery
    pub fn discover_fields(mut self, enabled: bool) -> Self {
        self.discover_fields = enabled;
        self
    }

    /// Storage name for `type_name`: the configured one, or the last path
    /// segment of the type name in lower case.
    ///
    /// ```
    /// use memorecord::EntityConfig;
    ///
    /// let config = EntityConfig::new();
    /// assert_eq!(config.resolve_storage_name("app::model::Widget"), "widget");
    /// assert_eq!(config.storage_name("widgets").resolve_storage_name("Widget"), "widgets");
    /// ```
    pub fn resolve_storage_name(&self, type_name: &str) -> String {
        if let Some(name) = self.storage_name.as_deref().filter(|name| !name.is_empty()) {
            return name.to_string();
        }

        type_name
            .rsplit(['\\', ':', '.'])
            .next()
            .unwrap_or(type_name)
            .to_lowercase()
    }
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self::new()
    }
}
