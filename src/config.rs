//! Service configuration.
//!
//! The allow-list of pickup point locations and the pagination window are
//! deployment configuration, not constants baked into the registry.

/// Configuration for the intake service.
///
/// # Example
/// ```
/// use priemka::config::Config;
///
/// let config = Config {
///     allowed_cities: vec!["Москва".to_string()],
///     ..Config::default()
/// };
/// assert!(config.is_allowed_city("Москва"));
/// assert!(!config.is_allowed_city("Казань"));
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Cities where a pickup point may be registered.
    pub allowed_cities: Vec<String>,

    /// Page size applied when the caller supplies none, or one outside
    /// `[1, max_page_size]`.
    pub default_page_size: u32,

    /// Upper bound of the accepted page size window.
    pub max_page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allowed_cities: vec![
                "Москва".to_string(),
                "Санкт-Петербург".to_string(),
                "Казань".to_string(),
            ],
            default_page_size: 10,
            max_page_size: 30,
        }
    }
}

impl Config {
    /// Whether a pickup point may be registered in this city.
    pub fn is_allowed_city(&self, city: &str) -> bool {
        self.allowed_cities.iter().any(|c| c == city)
    }
}
