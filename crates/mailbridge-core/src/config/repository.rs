//! Provider configuration store.
//!
//! In-memory, process-lifetime storage for [`ProviderConfig`] records.
//! Embedding applications that need configurations to survive restarts
//! wrap or replace this with their own persistence.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use mailbridge_oauth::ProviderType;
use tracing::debug;

use super::model::{ConfigId, ProviderConfig, validate_config};
use crate::error::{Error, Result};

/// Repository for provider configuration records.
#[derive(Debug, Default)]
pub struct ConfigRepository {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    configs: BTreeMap<ConfigId, ProviderConfig>,
    next_id: i64,
}

impl ConfigRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration record, assigning its ID.
    ///
    /// Empty scope lists are filled with the provider's default scopes.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing.
    pub fn create(&self, mut config: ProviderConfig) -> Result<ProviderConfig> {
        validate_config(&config).map_err(Error::InvalidConfig)?;
        assign_default_scopes(&mut config);

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.next_id += 1;
        let id = ConfigId::new(inner.next_id);
        config.id = Some(id);
        inner.configs.insert(id, config.clone());

        debug!("created OAuth2 configuration {id} ({})", config.name);
        Ok(config)
    }

    /// Updates an existing configuration record.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing, the record has
    /// no ID, or no record with that ID exists.
    pub fn update(&self, mut config: ProviderConfig) -> Result<ProviderConfig> {
        validate_config(&config).map_err(Error::InvalidConfig)?;
        let id = config.id.ok_or(Error::MissingConfigId)?;
        assign_default_scopes(&mut config);

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !inner.configs.contains_key(&id) {
            return Err(Error::ConfigNotFound(format!("id {id}")));
        }
        inner.configs.insert(id, config.clone());

        debug!("updated OAuth2 configuration {id} ({})", config.name);
        Ok(config)
    }

    /// Deletes a configuration record. Deleting an unknown ID is a no-op.
    pub fn delete(&self, id: ConfigId) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.configs.remove(&id).is_some() {
            debug!("deleted OAuth2 configuration {id}");
        }
    }

    /// Returns the record with the given ID.
    #[must_use]
    pub fn get_by_id(&self, id: ConfigId) -> Option<ProviderConfig> {
        self.read(|inner| inner.configs.get(&id).cloned())
    }

    /// Returns the record with the given name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<ProviderConfig> {
        self.read(|inner| {
            inner
                .configs
                .values()
                .find(|config| config.name == name)
                .cloned()
        })
    }

    /// Returns the first record for a provider type.
    #[must_use]
    pub fn get_by_provider_type(&self, provider: ProviderType) -> Option<ProviderConfig> {
        self.read(|inner| {
            inner
                .configs
                .values()
                .find(|config| config.provider == provider)
                .cloned()
        })
    }

    /// Returns all records for a provider type.
    #[must_use]
    pub fn get_by_provider_type_all(&self, provider: ProviderType) -> Vec<ProviderConfig> {
        self.read(|inner| {
            inner
                .configs
                .values()
                .filter(|config| config.provider == provider)
                .cloned()
                .collect()
        })
    }

    /// Returns all records in ID order.
    #[must_use]
    pub fn get_all(&self) -> Vec<ProviderConfig> {
        self.read(|inner| inner.configs.values().cloned().collect())
    }

    /// Returns all enabled records.
    #[must_use]
    pub fn get_enabled(&self) -> Vec<ProviderConfig> {
        self.read(|inner| {
            inner
                .configs
                .values()
                .filter(|config| config.is_enabled)
                .cloned()
                .collect()
        })
    }

    /// Enables the first configuration for a provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider has no configuration.
    pub fn enable(&self, provider: ProviderType) -> Result<()> {
        self.set_enabled(provider, true)
    }

    /// Disables the first configuration for a provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider has no configuration.
    pub fn disable(&self, provider: ProviderType) -> Result<()> {
        self.set_enabled(provider, false)
    }

    /// Returns true if the provider has an enabled configuration.
    #[must_use]
    pub fn is_provider_enabled(&self, provider: ProviderType) -> bool {
        self.get_by_provider_type(provider)
            .is_some_and(|config| config.is_enabled)
    }

    /// Returns the provider's configuration for sign-in and refresh use.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider has no configuration or the
    /// configuration is disabled.
    pub fn provider_config(&self, provider: ProviderType) -> Result<ProviderConfig> {
        let config = self
            .get_by_provider_type(provider)
            .ok_or_else(|| Error::ConfigNotFound(format!("provider {provider}")))?;

        if !config.is_enabled {
            return Err(Error::ConfigDisabled(provider));
        }

        Ok(config)
    }

    fn set_enabled(&self, provider: ProviderType, enabled: bool) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let config = inner
            .configs
            .values_mut()
            .find(|config| config.provider == provider)
            .ok_or_else(|| Error::ConfigNotFound(format!("provider {provider}")))?;

        config.is_enabled = enabled;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> T {
        f(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Fills an empty scope list with the provider's defaults.
fn assign_default_scopes(config: &mut ProviderConfig) {
    if config.scopes.is_empty() {
        config.scopes = config
            .provider
            .profile()
            .default_scopes
            .iter()
            .map(ToString::to_string)
            .collect();
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::config::ValidationError;

    fn config(name: &str, provider: ProviderType) -> ProviderConfig {
        ProviderConfig {
            id: None,
            name: name.to_string(),
            provider,
            client_id: "cid".to_string(),
            client_secret: "cs".to_string(),
            redirect_uri: "http://localhost:8080".to_string(),
            scopes: Vec::new(),
            is_enabled: true,
        }
    }

    #[test]
    fn test_create_assigns_id_and_default_scopes() {
        let repo = ConfigRepository::new();
        let created = repo.create(config("gmail main", ProviderType::Gmail)).unwrap();

        assert_eq!(created.id, Some(ConfigId::new(1)));
        assert_eq!(created.scopes.len(), 3);
        assert_eq!(created.scopes[0], "https://mail.google.com/");
    }

    #[test]
    fn test_create_keeps_explicit_scopes() {
        let repo = ConfigRepository::new();
        let mut custom = config("custom", ProviderType::Outlook);
        custom.scopes = vec!["offline_access".to_string()];

        let created = repo.create(custom).unwrap();
        assert_eq!(created.scopes, vec!["offline_access".to_string()]);
    }

    #[test]
    fn test_create_rejects_missing_fields() {
        let repo = ConfigRepository::new();
        let mut invalid = config("x", ProviderType::Gmail);
        invalid.client_secret = String::new();

        let err = repo.create(invalid).unwrap_err();
        let Error::InvalidConfig(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors, vec![ValidationError::EmptyClientSecret]);
    }

    #[test]
    fn test_lookup_by_id_name_and_provider() {
        let repo = ConfigRepository::new();
        let gmail = repo.create(config("gmail main", ProviderType::Gmail)).unwrap();
        repo.create(config("outlook main", ProviderType::Outlook))
            .unwrap();

        assert_eq!(
            repo.get_by_id(gmail.id.unwrap()).unwrap().name,
            "gmail main"
        );
        assert_eq!(
            repo.get_by_name("outlook main").unwrap().provider,
            ProviderType::Outlook
        );
        assert_eq!(
            repo.get_by_provider_type(ProviderType::Gmail).unwrap().name,
            "gmail main"
        );
        assert!(repo.get_by_name("missing").is_none());
    }

    #[test]
    fn test_list_operations() {
        let repo = ConfigRepository::new();
        repo.create(config("a", ProviderType::Gmail)).unwrap();
        repo.create(config("b", ProviderType::Gmail)).unwrap();
        let mut disabled = config("c", ProviderType::Outlook);
        disabled.is_enabled = false;
        repo.create(disabled).unwrap();

        assert_eq!(repo.get_all().len(), 3);
        assert_eq!(repo.get_by_provider_type_all(ProviderType::Gmail).len(), 2);
        assert_eq!(repo.get_enabled().len(), 2);
    }

    #[test]
    fn test_update_replaces_record() {
        let repo = ConfigRepository::new();
        let mut created = repo.create(config("gmail main", ProviderType::Gmail)).unwrap();
        created.client_id = "new-cid".to_string();

        let updated = repo.update(created.clone()).unwrap();
        assert_eq!(updated.client_id, "new-cid");
        assert_eq!(
            repo.get_by_id(created.id.unwrap()).unwrap().client_id,
            "new-cid"
        );
    }

    #[test]
    fn test_update_requires_existing_record() {
        let repo = ConfigRepository::new();

        let missing_id = config("x", ProviderType::Gmail);
        assert!(matches!(
            repo.update(missing_id).unwrap_err(),
            Error::MissingConfigId
        ));

        let mut unknown = config("x", ProviderType::Gmail);
        unknown.id = Some(ConfigId::new(99));
        assert!(matches!(
            repo.update(unknown).unwrap_err(),
            Error::ConfigNotFound(_)
        ));
    }

    #[test]
    fn test_delete() {
        let repo = ConfigRepository::new();
        let created = repo.create(config("gmail main", ProviderType::Gmail)).unwrap();

        repo.delete(created.id.unwrap());
        assert!(repo.get_by_id(created.id.unwrap()).is_none());

        // Unknown IDs are ignored.
        repo.delete(ConfigId::new(42));
    }

    #[test]
    fn test_enable_disable() {
        let repo = ConfigRepository::new();
        repo.create(config("gmail main", ProviderType::Gmail)).unwrap();

        repo.disable(ProviderType::Gmail).unwrap();
        assert!(!repo.is_provider_enabled(ProviderType::Gmail));
        assert!(matches!(
            repo.provider_config(ProviderType::Gmail).unwrap_err(),
            Error::ConfigDisabled(ProviderType::Gmail)
        ));

        repo.enable(ProviderType::Gmail).unwrap();
        assert!(repo.is_provider_enabled(ProviderType::Gmail));
        assert!(repo.provider_config(ProviderType::Gmail).is_ok());

        assert!(matches!(
            repo.enable(ProviderType::Outlook).unwrap_err(),
            Error::ConfigNotFound(_)
        ));
    }

    #[test]
    fn test_provider_config_missing() {
        let repo = ConfigRepository::new();
        let err = repo.provider_config(ProviderType::Gmail).unwrap_err();
        assert!(err.to_string().contains("provider gmail"));
    }
}
