//! Host container - 플러그인 런타임을 감싸는 로컬 호스트
//!
//! ## 상태
//!
//! ```text
//! Created ─deploy─▶ Deployed ─bind─▶ Bound ─start─▶ Running ─stop─▶ Stopped
//! ```
//!
//! 실행 중에는 바인딩한 포트로 `GET /shutdown` 요청을 받으면 종료 트리거가
//! 발동된다. 연결마다 별도 태스크에서 읽으므로 느린 클라이언트가 다른 요청을
//! 막지 않는다. 매니페스트가 바뀌면 `redeploy` 로 배포 단위를 교체한다.

use async_trait::async_trait;
use plexus_core::{ArtifactResolver, ContextBuilder, PluginDescriptor, Scope};
use plexus_foundation::{Error, Result};
use std::collections::HashSet;
use std::ffi::OsString;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 포트 탐색 최대 횟수
const MAX_PORT_ATTEMPTS: u16 = 100;

/// 요청 첫 줄을 기다리는 최대 시간
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// DeploymentUnit
// ============================================================================

/// 호스트에 넘기는 배포 단위
#[derive(Debug, Clone, Default)]
pub struct DeploymentUnit {
    /// scope 별 클래스패스 (플랫폼 경로 구분자로 연결)
    pub compile_classpath: String,
    pub runtime_classpath: String,
    pub test_classpath: String,

    /// 플러그인 하나당 한 줄의 클래스패스
    pub plugins_list: Vec<String>,

    pub temp_directory: PathBuf,
}

impl DeploymentUnit {
    /// 배포 순서대로 정렬된 디스크립터로부터 생성
    ///
    /// 해석되지 않는 항목은 건너뛴다. 해당 플러그인은 런타임 로드 시
    /// 실패로 보고된다. 그 밖의 해석기 에러는 전파된다.
    pub fn from_descriptors(
        descriptors: &[PluginDescriptor],
        resolver: &dyn ArtifactResolver,
        temp_directory: impl Into<PathBuf>,
    ) -> Result<Self> {
        let mut scopes: [(Scope, Vec<PathBuf>); 3] = [
            (Scope::Compile, Vec::new()),
            (Scope::Runtime, Vec::new()),
            (Scope::Test, Vec::new()),
        ];

        for (scope, paths) in scopes.iter_mut() {
            let mut seen = HashSet::new();
            for descriptor in descriptors {
                for artifact in descriptor.classpath(*scope) {
                    match resolver.resolve(artifact) {
                        Ok(path) => {
                            if seen.insert(path.clone()) {
                                paths.push(path);
                            }
                        }
                        Err(e) if e.is_plugin_scoped() => {
                            debug!("Skipping {} in {} classpath: {}", artifact, scope, e)
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        let builder = ContextBuilder::new(resolver);
        let mut plugins_list = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            match builder.build(descriptor) {
                Ok(context) => plugins_list.push(join_classpath(context.classpath())?),
                Err(e) if e.is_plugin_scoped() => {
                    warn!("No classpath line for {}: {}", descriptor.coordinates(), e)
                }
                Err(e) => return Err(e),
            }
        }

        let [(_, compile), (_, runtime), (_, test)] = scopes;
        Ok(Self {
            compile_classpath: join_classpath(&compile)?,
            runtime_classpath: join_classpath(&runtime)?,
            test_classpath: join_classpath(&test)?,
            plugins_list,
            temp_directory: temp_directory.into(),
        })
    }
}

fn join_classpath(paths: &[PathBuf]) -> Result<String> {
    let joined: OsString = std::env::join_paths(paths)
        .map_err(|e| Error::InvalidInput(format!("Cannot build classpath: {}", e)))?;
    Ok(joined.to_string_lossy().into_owned())
}

// ============================================================================
// ShutdownTrigger
// ============================================================================

/// 외부에서 호스트 종료를 요청하는 트리거
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownTrigger {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn fire(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_fired(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

impl Default for ShutdownTrigger {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// HostContainer
// ============================================================================

/// 플러그인 런타임을 실행하는 호스트 컨테이너
#[async_trait]
pub trait HostContainer: Send + Sync {
    fn deploy(&mut self, unit: DeploymentUnit) -> Result<()>;

    /// 배포된 이후 배포 단위 교체 (리로드)
    fn redeploy(&mut self, unit: DeploymentUnit) -> Result<()>;

    /// `first_port` 부터 사용 가능한 포트를 찾아 바인딩
    fn bind(&mut self, first_port: u16) -> Result<u16>;

    async fn start(&mut self) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;

    fn shutdown_trigger(&self) -> ShutdownTrigger;
}

/// 호스트 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Created,
    Deployed,
    Bound,
    Running,
    Stopped,
}

/// 로컬 호스트
pub struct LocalHost {
    state: HostState,
    unit: Option<DeploymentUnit>,
    listener: Option<StdTcpListener>,
    port: Option<u16>,
    trigger: ShutdownTrigger,
    server: Option<JoinHandle<()>>,
}

impl LocalHost {
    pub fn new() -> Self {
        Self {
            state: HostState::Created,
            unit: None,
            listener: None,
            port: None,
            trigger: ShutdownTrigger::new(),
            server: None,
        }
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn unit(&self) -> Option<&DeploymentUnit> {
        self.unit.as_ref()
    }

    fn expect_state(&self, expected: HostState, action: &str) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidInput(format!(
                "Cannot {} host in state {:?}",
                action, self.state
            )));
        }
        Ok(())
    }
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostContainer for LocalHost {
    fn deploy(&mut self, unit: DeploymentUnit) -> Result<()> {
        self.expect_state(HostState::Created, "deploy")?;
        std::fs::create_dir_all(&unit.temp_directory)?;
        info!(
            "Deployed {} plugins (temp: {})",
            unit.plugins_list.len(),
            unit.temp_directory.display()
        );
        self.unit = Some(unit);
        self.state = HostState::Deployed;
        Ok(())
    }

    fn redeploy(&mut self, unit: DeploymentUnit) -> Result<()> {
        if matches!(self.state, HostState::Created | HostState::Stopped) {
            return Err(Error::InvalidInput(format!(
                "Cannot redeploy host in state {:?}",
                self.state
            )));
        }
        std::fs::create_dir_all(&unit.temp_directory)?;
        debug!("Redeployed {} plugins", unit.plugins_list.len());
        self.unit = Some(unit);
        Ok(())
    }

    fn bind(&mut self, first_port: u16) -> Result<u16> {
        self.expect_state(HostState::Deployed, "bind")?;
        let (listener, port) = next_available_port(first_port)?;
        self.listener = Some(listener);
        self.port = Some(port);
        self.state = HostState::Bound;
        Ok(port)
    }

    async fn start(&mut self) -> Result<()> {
        self.expect_state(HostState::Bound, "start")?;
        let listener = self
            .listener
            .take()
            .ok_or_else(|| Error::Internal("Bound host has no listener".into()))?;
        listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(listener)?;

        self.server = Some(tokio::spawn(serve(listener, self.trigger.clone())));
        self.state = HostState::Running;
        info!("Host running on port {}", self.port.unwrap_or_default());
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if self.state == HostState::Stopped {
            return Ok(());
        }
        if let Some(server) = self.server.take() {
            server.abort();
            let _ = server.await;
        }
        self.listener = None;
        self.state = HostState::Stopped;
        info!("Host stopped");
        Ok(())
    }

    fn shutdown_trigger(&self) -> ShutdownTrigger {
        self.trigger.clone()
    }
}

fn next_available_port(first: u16) -> Result<(StdTcpListener, u16)> {
    let mut port = first;
    for _ in 0..MAX_PORT_ATTEMPTS {
        match StdTcpListener::bind(("127.0.0.1", port)) {
            Ok(listener) => {
                // 0 을 요청한 경우 OS 가 고른 포트
                let bound = listener.local_addr()?.port();
                return Ok((listener, bound));
            }
            Err(e) => debug!("Port {} unavailable: {}", port, e),
        }
        port = match port.checked_add(1) {
            Some(next) => next,
            None => break,
        };
    }
    Err(Error::Config(format!(
        "No available port in {}..{}",
        first,
        first.saturating_add(MAX_PORT_ATTEMPTS)
    )))
}

/// `/shutdown` 만 처리하는 최소 HTTP 응답기
async fn serve(listener: TcpListener, trigger: ShutdownTrigger) {
    let mut fired = trigger.subscribe();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(respond(stream, peer, trigger.clone()));
                }
                Err(e) => warn!("Accept failed: {}", e),
            },
            _ = fired.changed() => break,
        }
    }
}

async fn respond(mut stream: TcpStream, peer: SocketAddr, trigger: ShutdownTrigger) {
    let mut buf = [0u8; 1024];
    let n = match tokio::time::timeout(REQUEST_TIMEOUT, stream.read(&mut buf)).await {
        Ok(Ok(n)) => n,
        Ok(Err(e)) => {
            debug!("Failed to read from {}: {}", peer, e);
            return;
        }
        Err(_) => {
            debug!("No request from {} within {:?}", peer, REQUEST_TIMEOUT);
            return;
        }
    };
    let request = String::from_utf8_lossy(&buf[..n]);

    let response = if is_shutdown_request(&request) {
        info!("Shutdown requested by {}", peer);
        trigger.fire();
        "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n"
    } else {
        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n"
    };
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        debug!("Failed to respond to {}: {}", peer, e);
    }
}

fn is_shutdown_request(request: &str) -> bool {
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    matches!(
        (parts.next(), parts.next()),
        (Some("GET") | Some("POST"), Some("/shutdown"))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexus_core::{ArtifactRef, LocalRepositoryResolver};
    use std::path::Path;

    fn jar(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"PK").unwrap();
        path
    }

    #[test]
    fn test_deployment_unit_classpaths() {
        let dir = tempfile::tempdir().unwrap();
        let api = jar(dir.path(), "api.jar");
        let util = jar(dir.path(), "util.jar");
        let junit = jar(dir.path(), "junit.jar");

        let a_jar = jar(dir.path(), "a.jar");
        let b_jar = jar(dir.path(), "b.jar");

        let mut a = PluginDescriptor::new(ArtifactRef::new("org.example", "a", "1.0").with_file(&a_jar));
        a.add_classpath_entry(Scope::Compile, ArtifactRef::new("org.example", "api", "1").with_file(&api));
        a.add_classpath_entry(Scope::Test, ArtifactRef::new("junit", "junit", "4").with_file(&junit));
        let mut b = PluginDescriptor::new(ArtifactRef::new("org.example", "b", "1.0").with_file(&b_jar));
        b.add_classpath_entry(Scope::Compile, ArtifactRef::new("org.example", "api", "1").with_file(&api));
        b.add_classpath_entry(Scope::Runtime, ArtifactRef::new("org.lib", "util", "1").with_file(&util));

        let resolver = LocalRepositoryResolver::new(dir.path().join("repo"));
        let unit = DeploymentUnit::from_descriptors(&[a, b], &resolver, dir.path().join("tmp")).unwrap();

        assert_eq!(unit.compile_classpath, join_classpath(&[api.clone()]).unwrap());
        assert_eq!(unit.runtime_classpath, join_classpath(&[util.clone()]).unwrap());
        assert_eq!(unit.test_classpath, join_classpath(&[junit]).unwrap());
        assert_eq!(
            unit.plugins_list,
            vec![
                join_classpath(&[a_jar, api.clone()]).unwrap(),
                join_classpath(&[b_jar, api, util]).unwrap(),
            ]
        );
    }

    #[test]
    fn test_unresolvable_plugin_has_no_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = PluginDescriptor::new(ArtifactRef::new("org.example", "a", "1.0"));
        a.add_classpath_entry(Scope::Compile, ArtifactRef::new("org.example", "missing", "1"));

        let resolver = LocalRepositoryResolver::new(dir.path());
        let unit = DeploymentUnit::from_descriptors(&[a], &resolver, dir.path()).unwrap();

        assert!(unit.plugins_list.is_empty());
        assert!(unit.compile_classpath.is_empty());
    }

    struct BrokenDisk;

    impl ArtifactResolver for BrokenDisk {
        fn resolve(&self, _artifact: &ArtifactRef) -> Result<PathBuf> {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "disk failure",
            )))
        }
    }

    #[test]
    fn test_resolver_failure_is_not_skipped() {
        let mut a = PluginDescriptor::new(ArtifactRef::new("org.example", "a", "1.0"));
        a.add_classpath_entry(Scope::Compile, ArtifactRef::new("org.example", "api", "1"));

        let result = DeploymentUnit::from_descriptors(&[a], &BrokenDisk, "/tmp/plexus");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_redeploy_replaces_unit() {
        let dir = tempfile::tempdir().unwrap();
        let unit = |lines: &[&str]| DeploymentUnit {
            plugins_list: lines.iter().map(|l| l.to_string()).collect(),
            temp_directory: dir.path().join("temp"),
            ..Default::default()
        };

        let mut host = LocalHost::new();
        assert!(host.redeploy(unit(&["a.jar"])).is_err());

        host.deploy(unit(&["a.jar"])).unwrap();
        host.bind(0).unwrap();
        host.redeploy(unit(&["a.jar", "b.jar"])).unwrap();

        assert_eq!(host.state(), HostState::Bound);
        assert_eq!(host.unit().unwrap().plugins_list, vec!["a.jar", "b.jar"]);
    }

    #[test]
    fn test_next_available_port_skips_taken() {
        let taken = StdTcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = taken.local_addr().unwrap().port();

        let (_listener, bound) = next_available_port(port).unwrap();
        assert_ne!(bound, port);
        assert!(bound > port);
    }

    #[test]
    fn test_shutdown_request_parsing() {
        assert!(is_shutdown_request("GET /shutdown HTTP/1.1\r\nHost: x\r\n\r\n"));
        assert!(is_shutdown_request("POST /shutdown HTTP/1.1\r\n"));
        assert!(!is_shutdown_request("GET /shutdownx HTTP/1.1\r\n"));
        assert!(!is_shutdown_request(""));
    }

    #[test]
    fn test_lifecycle_order_is_enforced() {
        let mut host = LocalHost::new();
        assert!(host.bind(0).is_err());

        let dir = tempfile::tempdir().unwrap();
        host.deploy(DeploymentUnit {
            temp_directory: dir.path().join("temp"),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(host.state(), HostState::Deployed);
        assert!(dir.path().join("temp").is_dir());

        host.bind(0).unwrap();
        assert_eq!(host.state(), HostState::Bound);
        assert!(host.port().is_some());
    }

    #[tokio::test]
    async fn test_shutdown_endpoint_fires_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = LocalHost::new();
        host.deploy(DeploymentUnit {
            temp_directory: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        let port = host.bind(0).unwrap();
        host.start().await.unwrap();

        let trigger = host.shutdown_trigger();
        let mut fired = trigger.subscribe();

        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream.write_all(b"GET /shutdown HTTP/1.1\r\n\r\n").await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.ok();

        fired.changed().await.unwrap();
        assert!(trigger.is_fired());

        host.stop().await.unwrap();
        assert_eq!(host.state(), HostState::Stopped);
    }

    #[tokio::test]
    async fn test_idle_client_does_not_block_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = LocalHost::new();
        host.deploy(DeploymentUnit {
            temp_directory: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        let port = host.bind(0).unwrap();
        host.start().await.unwrap();
        let mut fired = host.shutdown_trigger().subscribe();

        // 연결만 하고 아무것도 보내지 않는 클라이언트
        let _idle = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream.write_all(b"POST /shutdown HTTP/1.1\r\n\r\n").await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(3), fired.changed()).await;
        assert!(matches!(result, Ok(Ok(()))));

        host.stop().await.unwrap();
    }
}
