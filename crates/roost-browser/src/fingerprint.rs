use rand::Rng;

/// Browser-level presentation knobs applied to every opened surface.
///
/// The user agent itself travels with the account; this covers the rest of
/// what a page can observe about the client.
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub timezone: String,
}

impl FingerprintConfig {
    /// Generate a randomized fingerprint configuration.
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();

        // Common desktop viewport sizes
        let viewports = [(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];
        let (width, height) = viewports[rng.gen_range(0..viewports.len())];

        Self {
            viewport_width: width,
            viewport_height: height,
            timezone: "America/New_York".to_string(),
        }
    }

    /// Pick a plausible desktop user agent for accounts enrolled without one.
    pub fn random_user_agent() -> String {
        let mut rng = rand::thread_rng();
        let user_agents = [
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        ];
        user_agents[rng.gen_range(0..user_agents.len())].to_string()
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self::randomized()
    }
}
