//! Nameserver and domain list loading.
//!
//! Nameservers come either from one of the bundled provider lists or from a
//! custom newline-delimited file. Domains come from a single `-d` value or a
//! newline-delimited file, the file taking precedence.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ConfigError, Result, ValidationError};

/// Cloud vendors whose published nameserver lists are bundled in the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Aws,
    Azure,
    Gcp,
}

impl Provider {
    /// Every bundled provider, in the order `cloud` expands to.
    pub const ALL: [Self; 3] = [Self::Aws, Self::Azure, Self::Gcp];

    const fn contents(self) -> &'static str {
        match self {
            Self::Aws => include_str!("../nslists/aws.txt"),
            Self::Azure => include_str!("../nslists/azure.txt"),
            Self::Gcp => include_str!("../nslists/gcp.txt"),
        }
    }

    /// Hostnames of the provider's nameservers.
    pub fn nameservers(self) -> Vec<String> {
        parse_lines(self.contents())
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Aws => "aws",
            Self::Azure => "azure",
            Self::Gcp => "gcp",
        })
    }
}

/// Where the nameserver hostnames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameserverSource {
    /// One or more bundled provider lists.
    Bundled(Vec<Provider>),
    /// A custom newline-delimited file.
    File(PathBuf),
}

impl FromStr for NameserverSource {
    type Err = std::convert::Infallible;

    /// Any selector that is not a known provider name is a file path.
    fn from_str(selector: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match selector {
            "aws" => Self::Bundled(vec![Provider::Aws]),
            "azure" => Self::Bundled(vec![Provider::Azure]),
            "gcp" => Self::Bundled(vec![Provider::Gcp]),
            "cloud" => Self::Bundled(Provider::ALL.to_vec()),
            path => Self::File(PathBuf::from(path)),
        })
    }
}

impl fmt::Display for NameserverSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bundled(providers) if providers.len() == Provider::ALL.len() => {
                f.write_str("cloud")
            }
            Self::Bundled(providers) => {
                let names: Vec<String> = providers.iter().map(ToString::to_string).collect();
                f.write_str(&names.join(","))
            }
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl NameserverSource {
    /// Load the hostnames, failing if the selection yields none.
    pub async fn load(&self) -> Result<Vec<String>> {
        let hostnames = match self {
            Self::Bundled(providers) => providers
                .iter()
                .flat_map(|provider| provider.nameservers())
                .collect(),
            Self::File(path) => load_lines(path).await?,
        };

        if hostnames.is_empty() {
            return Err(
                ConfigError::from(ValidationError::EmptyNameserverList(self.to_string())).into(),
            );
        }

        Ok(hostnames)
    }
}

/// Build the domain list from a list file or a single domain.
///
/// The file wins when both are given.
pub async fn load_domains(domain: Option<&str>, list: Option<&Path>) -> Result<Vec<String>> {
    if let Some(path) = list {
        return load_lines(path).await;
    }

    match domain.map(str::trim) {
        Some(domain) if !domain.is_empty() => Ok(vec![domain.to_string()]),
        _ => Err(ConfigError::from(ValidationError::MissingDomain).into()),
    }
}

/// Read a newline-delimited file into trimmed, non-blank lines.
pub async fn load_lines(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::ListFile {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(parse_lines(&content))
}

fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_list(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn should_parse_known_provider_selectors() {
        assert_eq!(
            "aws".parse::<NameserverSource>().unwrap(),
            NameserverSource::Bundled(vec![Provider::Aws])
        );
        assert_eq!(
            "cloud".parse::<NameserverSource>().unwrap(),
            NameserverSource::Bundled(vec![Provider::Aws, Provider::Azure, Provider::Gcp])
        );
        assert_eq!(
            "lists/custom.txt".parse::<NameserverSource>().unwrap(),
            NameserverSource::File(PathBuf::from("lists/custom.txt"))
        );
    }

    #[test]
    fn should_bundle_non_empty_provider_lists() {
        for provider in Provider::ALL {
            let nameservers = provider.nameservers();
            assert!(!nameservers.is_empty(), "{provider} list is empty");
            assert!(nameservers.iter().all(|ns| !ns.trim().is_empty()));
        }
    }

    #[tokio::test]
    async fn should_expand_cloud_to_all_providers_in_order() {
        let source: NameserverSource = "cloud".parse().unwrap();
        let all = source.load().await.unwrap();

        let expected: Vec<String> = Provider::ALL
            .iter()
            .flat_map(|provider| provider.nameservers())
            .collect();
        assert_eq!(all, expected);
    }

    #[tokio::test]
    async fn should_trim_and_skip_blank_lines() {
        let file = temp_list("ns1.example\n\n  ns2.example  \r\n\t\nns3.example");
        let lines = load_lines(file.path()).await.unwrap();
        assert_eq!(lines, vec!["ns1.example", "ns2.example", "ns3.example"]);
    }

    #[tokio::test]
    async fn should_keep_duplicate_entries() {
        let file = temp_list("ns1.example\nns1.example\n");
        let source = NameserverSource::File(file.path().to_path_buf());
        assert_eq!(source.load().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn should_reject_empty_nameserver_file() {
        let file = temp_list("\n\n");
        let source = NameserverSource::File(file.path().to_path_buf());
        let err = source.load().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::Validation(
                ValidationError::EmptyNameserverList(_)
            ))
        ));
    }

    #[tokio::test]
    async fn should_fail_on_missing_list_file() {
        let err = load_lines(Path::new("/nonexistent/domains.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ListFile { .. })));
    }

    #[tokio::test]
    async fn should_prefer_list_file_over_single_domain() {
        let file = temp_list("a.test\nb.test\n");
        let domains = load_domains(Some("ignored.test"), Some(file.path()))
            .await
            .unwrap();
        assert_eq!(domains, vec!["a.test", "b.test"]);
    }

    #[tokio::test]
    async fn should_use_single_domain_without_list() {
        let domains = load_domains(Some("a.test"), None).await.unwrap();
        assert_eq!(domains, vec!["a.test"]);
    }

    #[tokio::test]
    async fn should_require_domain_or_list() {
        for domain in [None, Some(""), Some("   ")] {
            let err = load_domains(domain, None).await.unwrap_err();
            assert!(matches!(
                err,
                Error::Config(ConfigError::Validation(ValidationError::MissingDomain))
            ));
        }
    }
}
