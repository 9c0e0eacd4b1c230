use serde::{Deserialize, Serialize};

/// Address family of an [`Endpoint`], mirroring the original `Endpoint::Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    V4,
    V6,
}

/// A peer's network location: `(ip, port, family)`.
///
/// The runtime only ever constructs loopback `V4` endpoints (§6: node `i` binds
/// `8800 + i` on `127.0.0.1`), but the type carries `family` so a future
/// multi-host deployment doesn't need a breaking change here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
    pub family: AddressFamily,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, port: u16, family: AddressFamily) -> Self {
        Self {
            address: address.into(),
            port,
            family,
        }
    }

    /// A loopback `V4` endpoint on the given port, as used by every demo binary.
    pub fn loopback(port: u16) -> Self {
        Self::new("127.0.0.1", port, AddressFamily::V4)
    }

    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_formats_as_host_colon_port() {
        let e = Endpoint::loopback(8801);
        assert_eq!(e.socket_addr_string(), "127.0.0.1:8801");
    }
}
