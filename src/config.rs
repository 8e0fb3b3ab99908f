#[derive(Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub vapid_private_key: Option<String>,
    pub vapid_public_key: Option<String>,
    pub vapid_subject: Option<String>,
    pub push_fanout_limit: usize,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Pushgate".to_string(),
            vapid_private_key: None,
            vapid_public_key: None,
            vapid_subject: None,
            push_fanout_limit: crate::push::DEFAULT_FANOUT_LIMIT,
        }
    }
}
