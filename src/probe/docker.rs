//! Docker container health probing.
//!
//! Locator forms:
//!
//! * `docker://host:port/<id>` talks to a daemon over TCP;
//! * `docker:///var/run/docker.sock/<id>` talks to a daemon over a Unix socket;
//! * `docker:///<id>` uses the local defaults of the Docker client.
//!
//! Without an id, the `name` or `image` option selects the container.

use super::{Probe, ProbeContext};
use crate::dispatch::ConfigError;
use crate::error::{unavailable, Context, Result, Unavailable};
use crate::locator::Locator;
use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, ListContainersOptions};
use bollard::errors::Error as DockerError;
use bollard::models::{ContainerState, ContainerSummary, HealthStatusEnum};
use bollard::{Docker, API_DEFAULT_VERSION};
use std::fmt;

pub const DEFAULT_TCP_PORT: u16 = 2375;
const CLIENT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerTarget {
    Id(String),
    Name(String),
    Image(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerEndpoint {
    Tcp(String),
    Unix(String),
    LocalDefaults,
}

#[derive(Debug, Clone)]
pub struct DockerProbe {
    display: String,
    endpoint: DockerEndpoint,
    target: DockerTarget,
}

impl DockerProbe {
    pub fn from_locator(locator: &Locator) -> Result<Self, ConfigError> {
        let display = locator.to_string();
        let path = locator.path();

        let (endpoint, id) = match locator.host() {
            Some(host) => {
                let port = locator.port().unwrap_or(DEFAULT_TCP_PORT);
                (DockerEndpoint::Tcp(format!("tcp://{host}:{port}")), path)
            }
            None => match path.rsplit_once('/') {
                Some((dir, id)) if !dir.is_empty() => (DockerEndpoint::Unix(dir.to_string()), id),
                _ => (DockerEndpoint::LocalDefaults, path),
            },
        };
        let id = id.trim_start_matches('/');

        let options = locator.options();
        let target = if !id.is_empty() {
            DockerTarget::Id(id.to_string())
        } else if let Some(name) = options.first("name").filter(|name| !name.is_empty()) {
            DockerTarget::Name(name.to_string())
        } else if let Some(image) = options.first("image").filter(|image| !image.is_empty()) {
            DockerTarget::Image(image.to_string())
        } else {
            return Err(ConfigError::MissingContainer { locator: display });
        };

        Ok(Self {
            display,
            endpoint,
            target,
        })
    }

    pub fn endpoint(&self) -> &DockerEndpoint {
        &self.endpoint
    }

    pub fn target(&self) -> &DockerTarget {
        &self.target
    }

    fn client(&self) -> Result<Docker> {
        let docker = match &self.endpoint {
            DockerEndpoint::Tcp(address) => {
                Docker::connect_with_http(address, CLIENT_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
            #[cfg(unix)]
            DockerEndpoint::Unix(socket) => {
                Docker::connect_with_unix(socket, CLIENT_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
            #[cfg(not(unix))]
            DockerEndpoint::Unix(socket) => {
                crate::bail_err!("unix socket `{socket}` is not supported on this platform")
            }
            DockerEndpoint::LocalDefaults => Docker::connect_with_local_defaults(),
        };
        docker.context("failed to create docker client")
    }

    async fn resolve_id(&self, docker: &Docker) -> Result<String> {
        let wanted = match &self.target {
            DockerTarget::Id(id) => return Ok(id.clone()),
            DockerTarget::Name(name) | DockerTarget::Image(name) => name,
        };

        let containers = docker
            .list_containers(Some(ListContainersOptions::<String> {
                all: true,
                ..Default::default()
            }))
            .await
            .context("failed to list containers")?;

        find_container(&containers, &self.target)
            .ok_or_else(|| unavailable(format!("container {wanted} not found")))
    }

    async fn check(&self) -> Result<()> {
        let docker = self.client()?;
        let id = self.resolve_id(&docker).await?;

        let inspect = match docker
            .inspect_container(&id, None::<InspectContainerOptions>)
            .await
        {
            Ok(inspect) => inspect,
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => return Err(unavailable(format!("container {id} not found"))),
            Err(err) => return Err(err).with_context(|| format!("failed to inspect {id}")),
        };

        check_health(inspect.state.as_ref())
    }
}

fn find_container(containers: &[ContainerSummary], target: &DockerTarget) -> Option<String> {
    let matches = |container: &&ContainerSummary| match target {
        DockerTarget::Id(id) => container.id.as_deref() == Some(id.as_str()),
        DockerTarget::Name(name) => {
            let wanted = format!("/{name}");
            container
                .names
                .as_deref()
                .unwrap_or_default()
                .iter()
                .any(|candidate| *candidate == wanted)
        }
        DockerTarget::Image(image) => container.image.as_deref() == Some(image.as_str()),
    };
    containers.iter().find(matches).and_then(|c| c.id.clone())
}

/// A container is available once it runs unpaused and reports `healthy`.
fn check_health(state: Option<&ContainerState>) -> Result<()> {
    let state = state.ok_or_else(|| Unavailable::msg("unknown container state"))?;

    if !state.running.unwrap_or(false) {
        return Err(Unavailable::msg("container not running").into());
    }
    if state.paused.unwrap_or(false) {
        return Err(Unavailable::msg("container paused").into());
    }
    if state.restarting.unwrap_or(false) {
        return Err(Unavailable::msg("container restarting").into());
    }

    let status = state
        .health
        .as_ref()
        .and_then(|health| health.status)
        .filter(|status| !matches!(status, HealthStatusEnum::EMPTY | HealthStatusEnum::NONE))
        .ok_or_else(|| Unavailable::msg("container without health check"))?;

    match status {
        HealthStatusEnum::HEALTHY => Ok(()),
        other => Err(Unavailable::msg(format!("container health status: {other}")).into()),
    }
}

#[async_trait]
impl Probe for DockerProbe {
    async fn attempt(&self, ctx: &ProbeContext) -> Result<()> {
        ctx.bounded(self.check()).await
    }
}

impl fmt::Display for DockerProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::parse;
    use bollard::models::Health;

    fn probe(input: &str) -> Result<DockerProbe, ConfigError> {
        DockerProbe::from_locator(&parse(input).expect("locator"))
    }

    fn running(health: Option<HealthStatusEnum>) -> ContainerState {
        ContainerState {
            running: Some(true),
            paused: Some(false),
            restarting: Some(false),
            health: Some(Health {
                status: health,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn endpoint_and_target_from_locator() {
        let tcp = probe("docker://daemon:2376/abc123").expect("probe");
        assert_eq!(
            tcp.endpoint(),
            &DockerEndpoint::Tcp("tcp://daemon:2376".to_string())
        );
        assert_eq!(tcp.target(), &DockerTarget::Id("abc123".to_string()));

        let unix = probe("docker:///var/run/docker.sock/abc123").expect("probe");
        assert_eq!(
            unix.endpoint(),
            &DockerEndpoint::Unix("/var/run/docker.sock".to_string())
        );

        let local = probe("docker:///abc123").expect("probe");
        assert_eq!(local.endpoint(), &DockerEndpoint::LocalDefaults);
        assert_eq!(local.target(), &DockerTarget::Id("abc123".to_string()));
    }

    #[test]
    fn name_then_image_select_the_container() {
        let named = probe("docker:///#name=db&image=postgres:16").expect("probe");
        assert_eq!(named.target(), &DockerTarget::Name("db".to_string()));

        let imaged = probe("docker://daemon#image=postgres:16").expect("probe");
        assert_eq!(imaged.target(), &DockerTarget::Image("postgres:16".to_string()));

        let err = probe("docker:///").expect_err("no container");
        assert!(matches!(err, ConfigError::MissingContainer { .. }));
    }

    #[test]
    fn name_lookup_matches_leading_slash() {
        let containers = vec![
            ContainerSummary {
                id: Some("1".to_string()),
                names: Some(vec!["/web".to_string()]),
                image: Some("nginx".to_string()),
                ..Default::default()
            },
            ContainerSummary {
                id: Some("2".to_string()),
                names: Some(vec!["/db".to_string()]),
                image: Some("postgres:16".to_string()),
                ..Default::default()
            },
        ];

        assert_eq!(
            find_container(&containers, &DockerTarget::Name("db".to_string())),
            Some("2".to_string())
        );
        assert_eq!(
            find_container(&containers, &DockerTarget::Image("nginx".to_string())),
            Some("1".to_string())
        );
        assert_eq!(
            find_container(&containers, &DockerTarget::Name("cache".to_string())),
            None
        );
    }

    #[test]
    fn only_running_healthy_containers_are_available() {
        check_health(Some(&running(Some(HealthStatusEnum::HEALTHY)))).expect("healthy");

        let err = check_health(Some(&running(Some(HealthStatusEnum::STARTING))))
            .expect_err("starting");
        assert_eq!(err.to_string(), "container health status: starting");

        let err = check_health(Some(&running(None))).expect_err("no health check");
        assert_eq!(err.to_string(), "container without health check");

        let mut paused = running(Some(HealthStatusEnum::HEALTHY));
        paused.paused = Some(true);
        assert_eq!(
            check_health(Some(&paused)).expect_err("paused").to_string(),
            "container paused"
        );

        let mut stopped = running(Some(HealthStatusEnum::HEALTHY));
        stopped.running = Some(false);
        assert!(check_health(Some(&stopped)).expect_err("stopped").is_unavailable());

        assert!(check_health(None).expect_err("no state").is_unavailable());
    }
}
