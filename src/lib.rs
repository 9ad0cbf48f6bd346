//! itoolkit: call IBM i programs, commands, and SQL through the
//! XMLSERVICE / DB2JSON host gateways.
//!
//! The crate models a request as a tree of typed nodes, serializes it into
//! the wire format the gateway expects, ships it over a transport, and
//! decodes the structured reply back into native values:
//! - Typed host scalars ([`HostType`]) and parameter trees ([`Data`],
//!   [`Ds`])
//! - Operations: CL command, PASE shell, `*PGM` / `*SRVPGM` calls, the SQL
//!   verbs, raw markup
//! - [`Toolkit`]: ordered request collector and reply selector (`list`,
//!   `dict`, `hybrid` shapes)
//! - Three-tier reply recovery: decode never raises; malformed output is
//!   downgraded to `*NODATA` / `*BADPARSE` / `*NOPARSE` markers
//! - DB2JSON payload variant ([`JsonToolkit`]) for the JSON gateway family
//! - Transports are a trait boundary: bring your own, or use the bundled
//!   HTTP/REST ones
//!
//! ```no_run
//! use itoolkit::{Cmd, Data, HostType, HttpTransport, Pgm, Toolkit};
//!
//! let transport = HttpTransport::new("http://host:port/cgi-bin/xmlcgi.pgm", "user", "pass");
//! let mut kit = Toolkit::new();
//! kit.add(Cmd::new("chglibl", "CHGLIBL LIBL(XMLSERVICE)"));
//! kit.add(
//!     Pgm::new("zzcall", "ZZCALL")
//!         .lib("XMLSERVICE")
//!         .parm(Data::new("INCHARA", HostType::char(1), "a")),
//! );
//! kit.call(&transport)?;
//! let zzcall = kit.dict_at("zzcall");
//! # Ok::<(), itoolkit::ToolkitError>(())
//! ```

pub mod decode;
pub mod error;
pub mod node;
pub mod ops;
pub mod payload;
pub mod reply;
pub mod toolkit;
pub mod trace;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use decode::{ParseTier, TagPolicy, BADPARSE, NODATA, NOPARSE};
pub use error::ToolkitError;
pub use node::{Data, DataOpts, Ds, PgmChild};
pub use ops::{
    CallMode, Cmd, ErrorMode, ExecMode, FetchBlock, FreeTarget, IoMode, Operation, PassBy, Pgm,
    RawXml, Sh, SqlExecute, SqlFetch, SqlFree, SqlParm, SqlPrepare, SqlQuery, SrvPgm,
};
pub use payload::{By, JsonCommand, JsonOp, JsonProgram, JsonToolkit, Param};
pub use reply::{Reply, ReplyMap};
pub use toolkit::Toolkit;
pub use trace::{TraceSink, TraceTarget};
pub use transport::{Db2JsonTransport, HttpTransport, JsonTransport, Transport};
pub use types::{HostType, Varying};
