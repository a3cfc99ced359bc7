use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::str::FromStr;

use log::info;
use thiserror::Error;

pub const OFP_TCP_PORT: u16 = 6633;

/// A connected byte stream to a switch.
pub trait Channel: Read + Write + Send {}

impl<T: Read + Write + Send> Channel for T {}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("Unknown connection type '{0}', expected tcp:, ptcp:, unix: or punix:")]
    UnknownScheme(String),
    #[error("Connection string '{0}' names no target")]
    MissingTarget(String),
    #[error("Bad port '{0}'")]
    BadPort(String),
    #[error("Bad IP address '{0}'")]
    BadAddress(String),
    #[error("Could not open {endpoint}: {source}")]
    Io {
        endpoint: String,
        #[source]
        source: io::Error,
    },
}

/// Where the switch connection comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `tcp:IP[:PORT]`
    Tcp(SocketAddr),
    /// `ptcp:[PORT][:IP]`
    PassiveTcp(SocketAddr),
    /// `unix:FILE`
    Unix(PathBuf),
    /// `punix:FILE`
    PassiveUnix(PathBuf),
}

fn parse_port(port: &str) -> Result<u16, EndpointError> {
    if port.is_empty() {
        return Ok(OFP_TCP_PORT);
    }
    port.parse().map_err(|_| EndpointError::BadPort(port.to_string()))
}

fn parse_ip(ip: &str) -> Result<IpAddr, EndpointError> {
    ip.parse().map_err(|_| EndpointError::BadAddress(ip.to_string()))
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(conn: &str) -> Result<Endpoint, EndpointError> {
        let (scheme, target) = match conn.find(':') {
            Some(i) => (&conn[..i], &conn[i + 1..]),
            None => return Err(EndpointError::UnknownScheme(conn.to_string())),
        };
        match scheme {
            "tcp" => {
                let mut parts = target.splitn(2, ':');
                let ip = match parts.next() {
                    Some(ip) if !ip.is_empty() => parse_ip(ip)?,
                    _ => return Err(EndpointError::MissingTarget(conn.to_string())),
                };
                let port = parse_port(parts.next().unwrap_or(""))?;
                Ok(Endpoint::Tcp(SocketAddr::new(ip, port)))
            }
            "ptcp" => {
                let mut parts = target.splitn(2, ':');
                let port = parse_port(parts.next().unwrap_or(""))?;
                let ip = match parts.next() {
                    Some(ip) if !ip.is_empty() => parse_ip(ip)?,
                    _ => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                };
                Ok(Endpoint::PassiveTcp(SocketAddr::new(ip, port)))
            }
            "unix" | "punix" => {
                if target.is_empty() {
                    return Err(EndpointError::MissingTarget(conn.to_string()));
                }
                let path = PathBuf::from(target);
                Ok(if scheme == "unix" {
                    Endpoint::Unix(path)
                } else {
                    Endpoint::PassiveUnix(path)
                })
            }
            _ => Err(EndpointError::UnknownScheme(scheme.to_string())),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Endpoint::Tcp(addr) => write!(f, "tcp:{}:{}", addr.ip(), addr.port()),
            Endpoint::PassiveTcp(addr) => write!(f, "ptcp:{}:{}", addr.port(), addr.ip()),
            Endpoint::Unix(ref path) => write!(f, "unix:{}", path.display()),
            Endpoint::PassiveUnix(ref path) => write!(f, "punix:{}", path.display()),
        }
    }
}

impl Endpoint {
    pub fn is_passive(&self) -> bool {
        match *self {
            Endpoint::PassiveTcp(_) | Endpoint::PassiveUnix(_) => true,
            Endpoint::Tcp(_) | Endpoint::Unix(_) => false,
        }
    }

    /// Connect, or listen and accept a single switch connection.
    pub fn open(&self) -> Result<Box<dyn Channel>, EndpointError> {
        self.open_stream().map_err(|source| {
            EndpointError::Io {
                endpoint: self.to_string(),
                source,
            }
        })
    }

    fn open_stream(&self) -> io::Result<Box<dyn Channel>> {
        match *self {
            Endpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr)?;
                stream.set_nodelay(true)?;
                info!("Connected to {}", self);
                Ok(Box::new(stream))
            }
            Endpoint::PassiveTcp(addr) => {
                let listener = TcpListener::bind(addr)?;
                info!("Listening on {}", self);
                let (stream, peer) = listener.accept()?;
                stream.set_nodelay(true)?;
                info!("Switch connected from {}", peer);
                Ok(Box::new(stream))
            }
            Endpoint::Unix(ref path) => {
                let stream = UnixStream::connect(path)?;
                info!("Connected to {}", self);
                Ok(Box::new(stream))
            }
            Endpoint::PassiveUnix(ref path) => {
                if let Err(e) = fs::remove_file(path) {
                    if e.kind() != io::ErrorKind::NotFound {
                        return Err(e);
                    }
                }
                let listener = UnixListener::bind(path)?;
                info!("Listening on {}", self);
                let (stream, _) = listener.accept()?;
                info!("Switch connected on {}", path.display());
                Ok(Box::new(stream))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_parse_tcp() {
        assert_eq!("tcp:10.0.0.1:6653".parse::<Endpoint>().unwrap(),
                   Endpoint::Tcp("10.0.0.1:6653".parse().unwrap()));
        assert_eq!("tcp:10.0.0.1".parse::<Endpoint>().unwrap(),
                   Endpoint::Tcp("10.0.0.1:6633".parse().unwrap()));
        assert!(!"tcp:10.0.0.1".parse::<Endpoint>().unwrap().is_passive());
    }

    #[test]
    fn test_parse_ptcp_defaults() {
        assert_eq!("ptcp:".parse::<Endpoint>().unwrap(),
                   Endpoint::PassiveTcp("0.0.0.0:6633".parse().unwrap()));
        assert_eq!("ptcp:6653".parse::<Endpoint>().unwrap(),
                   Endpoint::PassiveTcp("0.0.0.0:6653".parse().unwrap()));
        assert_eq!("ptcp:6653:127.0.0.1".parse::<Endpoint>().unwrap(),
                   Endpoint::PassiveTcp("127.0.0.1:6653".parse().unwrap()));
        assert_eq!("ptcp::127.0.0.1".parse::<Endpoint>().unwrap(),
                   Endpoint::PassiveTcp("127.0.0.1:6633".parse().unwrap()));
        assert!("ptcp:".parse::<Endpoint>().unwrap().is_passive());
    }

    #[test]
    fn test_parse_unix() {
        assert_eq!("unix:/var/run/switch.sock".parse::<Endpoint>().unwrap(),
                   Endpoint::Unix(PathBuf::from("/var/run/switch.sock")));
        assert_eq!("punix:/var/run/openvswitch/br0.controller".parse::<Endpoint>().unwrap(),
                   Endpoint::PassiveUnix(PathBuf::from("/var/run/openvswitch/br0.controller")));
    }

    #[test]
    fn test_parse_errors() {
        match "ssl:10.0.0.1".parse::<Endpoint>() {
            Err(EndpointError::UnknownScheme(s)) => assert_eq!(s, "ssl"),
            other => panic!("expected an unknown scheme, got {:?}", other),
        }
        assert!(matches!("10.0.0.1".parse::<Endpoint>(), Err(EndpointError::UnknownScheme(_))));
        assert!(matches!("tcp:".parse::<Endpoint>(), Err(EndpointError::MissingTarget(_))));
        assert!(matches!("punix:".parse::<Endpoint>(), Err(EndpointError::MissingTarget(_))));
        assert!(matches!("tcp:10.0.0.1:http".parse::<Endpoint>(), Err(EndpointError::BadPort(_))));
        assert!(matches!("ptcp:70000".parse::<Endpoint>(), Err(EndpointError::BadPort(_))));
        assert!(matches!("tcp:switch-1".parse::<Endpoint>(), Err(EndpointError::BadAddress(_))));
    }

    #[test]
    fn test_display_round_trip() {
        for conn in &["tcp:10.0.0.1:6633", "ptcp:6653:127.0.0.1", "unix:/tmp/a", "punix:/tmp/b"] {
            let endpoint: Endpoint = conn.parse().unwrap();
            assert_eq!(endpoint.to_string(), *conn);
        }
    }

    #[test]
    fn test_open_passive_unix() {
        let path = std::env::temp_dir()
            .join(format!("rust_ofp_bridge_transport_{}.sock", std::process::id()));
        let endpoint = Endpoint::PassiveUnix(path.clone());
        let client_path = path.clone();
        let client = thread::spawn(move || {
            for _ in 0..200 {
                if let Ok(mut stream) = UnixStream::connect(&client_path) {
                    stream.write_all(b"hello").unwrap();
                    return;
                }
                thread::sleep(Duration::from_millis(10));
            }
            panic!("could not connect");
        });
        let mut channel = endpoint.open().unwrap();
        let mut buf = [0u8; 5];
        channel.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
        client.join().unwrap();
        let _ = fs::remove_file(&path);
    }
}
