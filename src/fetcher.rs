use crate::config::ClientConfig;
use crate::error::ChefkochError;
use log::debug;
use reqwest::blocking::Client;

/// A page as delivered by the server, after following redirects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL, which differs from the requested one after a redirect
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The page itself, or `HttpStatus` when the server answered with an error
    pub fn into_success(self) -> Result<Self, ChefkochError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ChefkochError::HttpStatus {
                url: self.url,
                status: self.status,
            })
        }
    }
}

/// Transport used by the client. Implementations block until the response is read.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPage, ChefkochError>;

    /// Raw response body, e.g. an image. Non-success statuses are errors.
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ChefkochError>;
}

/// `Fetcher` backed by a blocking reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &ClientConfig) -> Result<Self, ChefkochError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPage, ChefkochError> {
        debug!("Fetching {}", url);
        let response = self.client.get(url).send()?;
        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        if final_url != url {
            debug!("{} redirected to {}", url, final_url);
        }
        let body = response.text()?;

        Ok(FetchedPage {
            url: final_url,
            status,
            body,
        })
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ChefkochError> {
        debug!("Downloading {}", url);
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChefkochError::HttpStatus {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}
