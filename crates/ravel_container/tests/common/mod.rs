//! Shared fixtures for the container integration tests.

#![allow(
    dead_code,
    reason = "fixtures are shared across several integration test binaries"
)]

use std::sync::Arc;

use ravel_container::prelude::*;

// ─────────────────────────────────────────────────────────────────────────
// Interface with competing implementations
// ─────────────────────────────────────────────────────────────────────────

pub trait Transport: Send + Sync + std::fmt::Debug {
    fn scheme(&self) -> &'static str;
}

#[derive(Debug)]
pub struct TcpTransport;

impl Transport for TcpTransport {
    fn scheme(&self) -> &'static str {
        "tcp"
    }
}

impl Construct for TcpTransport {
    fn bindings() -> Vec<Binding<Self>> {
        vec![Binding::of::<dyn Transport>(|it| it)]
    }

    fn construct(_: &mut Args) -> Result<Self, ConstructError> {
        Ok(Self)
    }
}

#[derive(Debug)]
pub struct UdpTransport;

impl Transport for UdpTransport {
    fn scheme(&self) -> &'static str {
        "udp"
    }
}

impl Construct for UdpTransport {
    fn bindings() -> Vec<Binding<Self>> {
        vec![Binding::of::<dyn Transport>(|it| it)]
    }

    fn construct(_: &mut Args) -> Result<Self, ConstructError> {
        Ok(Self)
    }
}

/// Deliberately not `Construct`: only ever supplied by hand.
#[derive(Debug)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn scheme(&self) -> &'static str {
        "null"
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Compositions over the interface
// ─────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Mailer {
    pub transport: Arc<dyn Transport>,
}

impl Construct for Mailer {
    fn parameters() -> Vec<Param> {
        vec![Param::dependency::<dyn Transport>("transport")]
    }

    fn construct(args: &mut Args) -> Result<Self, ConstructError> {
        Ok(Self {
            transport: args.take::<dyn Transport>("transport")?,
        })
    }
}

#[derive(Debug)]
pub struct Newsletter {
    pub mailer: Arc<Mailer>,
}

impl Construct for Newsletter {
    fn parameters() -> Vec<Param> {
        vec![Param::dependency::<Mailer>("mailer")]
    }

    fn construct(args: &mut Args) -> Result<Self, ConstructError> {
        Ok(Self {
            mailer: args.take::<Mailer>("mailer")?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Plain chain and diamond
// ─────────────────────────────────────────────────────────────────────────

pub struct Clock;

impl Construct for Clock {
    fn construct(_: &mut Args) -> Result<Self, ConstructError> {
        Ok(Self)
    }
}

pub struct Journal {
    pub clock: Arc<Clock>,
}

impl Construct for Journal {
    fn parameters() -> Vec<Param> {
        vec![Param::dependency::<Clock>("clock")]
    }

    fn construct(args: &mut Args) -> Result<Self, ConstructError> {
        Ok(Self {
            clock: args.take::<Clock>("clock")?,
        })
    }
}

pub struct Ledger {
    pub clock: Arc<Clock>,
    pub journal: Arc<Journal>,
}

impl Construct for Ledger {
    fn parameters() -> Vec<Param> {
        vec![
            Param::dependency::<Clock>("clock"),
            Param::dependency::<Journal>("journal"),
        ]
    }

    fn construct(args: &mut Args) -> Result<Self, ConstructError> {
        Ok(Self {
            clock: args.take::<Clock>("clock")?,
            journal: args.take::<Journal>("journal")?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Cycles
// ─────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Ouroboros {
    pub tail: Arc<Ouroboros>,
}

impl Construct for Ouroboros {
    fn parameters() -> Vec<Param> {
        vec![Param::dependency::<Ouroboros>("tail")]
    }

    fn construct(args: &mut Args) -> Result<Self, ConstructError> {
        Ok(Self {
            tail: args.take::<Ouroboros>("tail")?,
        })
    }
}

#[derive(Debug)]
pub struct Ping {
    pub pong: Arc<Pong>,
}

impl Construct for Ping {
    fn parameters() -> Vec<Param> {
        vec![Param::dependency::<Pong>("pong")]
    }

    fn construct(args: &mut Args) -> Result<Self, ConstructError> {
        Ok(Self {
            pong: args.take::<Pong>("pong")?,
        })
    }
}

#[derive(Debug)]
pub struct Pong {
    pub ping: Arc<Ping>,
}

impl Construct for Pong {
    fn parameters() -> Vec<Param> {
        vec![Param::dependency::<Ping>("ping")]
    }

    fn construct(args: &mut Args) -> Result<Self, ConstructError> {
        Ok(Self {
            ping: args.take::<Ping>("ping")?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Leaves and defaults
// ─────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Construct for Endpoint {
    fn parameters() -> Vec<Param> {
        vec![Param::leaf::<String>("host"), Param::leaf::<u16>("port")]
    }

    fn construct(args: &mut Args) -> Result<Self, ConstructError> {
        Ok(Self {
            host: args.value::<String>("host")?,
            port: args.value::<u16>("port")?,
        })
    }
}

pub struct Retry {
    pub limit: u32,
}

impl Construct for Retry {
    fn parameters() -> Vec<Param> {
        vec![Param::leaf_or("limit", || 3u32)]
    }

    fn construct(args: &mut Args) -> Result<Self, ConstructError> {
        Ok(Self {
            limit: args.value::<u32>("limit")?,
        })
    }
}

/// Depends on the transport interface but can fall back to [`NullTransport`]
/// when nothing is registered for it.
pub struct Prober {
    pub transport: Arc<dyn Transport>,
}

impl Construct for Prober {
    fn parameters() -> Vec<Param> {
        vec![Param::dependency_or::<dyn Transport>("transport", || {
            Arc::new(NullTransport) as Arc<dyn Transport>
        })]
    }

    fn construct(args: &mut Args) -> Result<Self, ConstructError> {
        Ok(Self {
            transport: args.take::<dyn Transport>("transport")?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────

/// Pointer identity across differently-typed views of one shared value.
pub fn same_object<A: ?Sized, B: ?Sized>(a: &Arc<A>, b: &Arc<B>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}
