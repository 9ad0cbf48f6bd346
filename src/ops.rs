//! Invocable operations.
//!
//! Each operation is one unit of work the host gateway can run: a CL
//! command, a PASE shell line, a program or service-program call, one of the
//! SQL verbs, or caller-supplied raw markup. Every operation carries a
//! correlation `key`; the gateway echoes it back as the `var` attribute on
//! the reply elements, which is how the decoder ties a slice of the reply to
//! the operation that produced it.

use crate::decode::dom::Document;
use crate::error::ToolkitError;
use crate::node::{push_attr, push_cdata, PgmChild};

use std::fmt;

/// Gateway error handling. `Fast` aborts the operation on first error and is
/// the default everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    On,
    Off,
    #[default]
    Fast,
}

impl fmt::Display for ErrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorMode::On => write!(f, "on"),
            ErrorMode::Off => write!(f, "off"),
            ErrorMode::Fast => write!(f, "fast"),
        }
    }
}

/// Command execution facility on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    Cmd,
    System,
    /// Value-returning command with `?` / `?N` output markers.
    Rexx,
}

impl fmt::Display for ExecMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecMode::Cmd => write!(f, "cmd"),
            ExecMode::System => write!(f, "system"),
            ExecMode::Rexx => write!(f, "rexx"),
        }
    }
}

/// Parameter I/O direction. Defaults to `Both`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IoMode {
    In,
    Out,
    #[default]
    Both,
    Omit,
}

impl fmt::Display for IoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoMode::In => write!(f, "in"),
            IoMode::Out => write!(f, "out"),
            IoMode::Both => write!(f, "both"),
            IoMode::Omit => write!(f, "omit"),
        }
    }
}

/// How a parameter is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassBy {
    Val,
    Ref,
}

impl fmt::Display for PassBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassBy::Val => write!(f, "val"),
            PassBy::Ref => write!(f, "ref"),
        }
    }
}

/// Program calling convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    Opm,
    Ile,
}

impl fmt::Display for CallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallMode::Opm => write!(f, "opm"),
            CallMode::Ile => write!(f, "ile"),
        }
    }
}

/// CL command, no `*OUTPUT`.
///
/// A `?` placeholder in the command text marks an output parameter, which
/// requires the REXX facility host-side; execution mode is inferred from the
/// text and may be overridden with [`Cmd::exec`].
#[derive(Debug, Clone)]
pub struct Cmd {
    key: String,
    cmd: String,
    exec: ExecMode,
    error: ErrorMode,
}

impl Cmd {
    pub fn new(key: impl Into<String>, cmd: impl Into<String>) -> Self {
        let cmd = cmd.into();
        let exec = if cmd.contains('?') {
            ExecMode::Rexx
        } else {
            ExecMode::Cmd
        };
        Cmd {
            key: key.into(),
            cmd,
            exec,
            error: ErrorMode::default(),
        }
    }

    pub fn exec(mut self, exec: ExecMode) -> Self {
        self.exec = exec;
        self
    }

    pub fn error(mut self, error: ErrorMode) -> Self {
        self.error = error;
        self
    }

    pub fn exec_mode(&self) -> ExecMode {
        self.exec
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<cmd");
        push_attr(out, "exec", &self.exec.to_string());
        push_attr(out, "error", &self.error.to_string());
        push_attr(out, "var", &self.key);
        out.push('>');
        push_cdata(out, &self.cmd);
        out.push_str("</cmd>");
    }
}

/// One PASE utility invocation.
///
/// The gateway runs this through its popen facility: a job is forked, the
/// utility exec'd, stdout collected. That is slow relative to every other
/// operation here; use sparingly on hot paths.
#[derive(Debug, Clone)]
pub struct Sh {
    key: String,
    cmd: String,
    rows: Option<bool>,
    error: ErrorMode,
}

impl Sh {
    pub fn new(key: impl Into<String>, cmd: impl Into<String>) -> Self {
        Sh {
            key: key.into(),
            cmd: cmd.into(),
            rows: None,
            error: ErrorMode::default(),
        }
    }

    /// 5250 command whose display output is wanted: routed through
    /// `/QOpenSys/usr/bin/system`.
    pub fn cmd5250(key: impl Into<String>, cmd: impl Into<String>) -> Self {
        let cmd = format!("/QOpenSys/usr/bin/system {}", cmd.into());
        Sh::new(key, cmd)
    }

    /// Split stdout into one `<row>` element per line.
    pub fn rows(mut self, on: bool) -> Self {
        self.rows = Some(on);
        self
    }

    pub fn error(mut self, error: ErrorMode) -> Self {
        self.error = error;
        self
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<sh");
        if let Some(on) = self.rows {
            push_attr(out, "row", if on { "on" } else { "off" });
        }
        push_attr(out, "error", &self.error.to_string());
        push_attr(out, "var", &self.key);
        out.push('>');
        push_cdata(out, &self.cmd);
        out.push_str("</sh>");
    }
}

/// One positional parameter slot of a program call.
#[derive(Debug, Clone)]
struct Parm {
    label: String,
    io: IoMode,
    by: Option<PassBy>,
    child: PgmChild,
}

impl Parm {
    fn write_xml(&self, out: &mut String) {
        out.push_str("<parm");
        push_attr(out, "io", &self.io.to_string());
        if let Some(by) = self.by {
            push_attr(out, "by", &by.to_string());
        }
        push_attr(out, "var", &self.label);
        out.push('>');
        self.child.write_xml(out);
        out.push_str("</parm>");
    }
}

/// `*PGM` call.
///
/// Parameters are positional: each [`Pgm::parm`] gets the next label in the
/// `p1`, `p2`, … sequence, and that label is the key the decoded reply
/// surfaces the parameter under. Order at build time fixes the decode key.
#[derive(Debug, Clone)]
pub struct Pgm {
    key: String,
    name: String,
    lib: Option<String>,
    func: Option<String>,
    mode: Option<CallMode>,
    error: ErrorMode,
    parms: Vec<Parm>,
    rets: Vec<(String, PgmChild)>,
}

impl Pgm {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Pgm {
            key: key.into(),
            name: name.into(),
            lib: None,
            func: None,
            mode: None,
            error: ErrorMode::default(),
            parms: Vec::new(),
            rets: Vec::new(),
        }
    }

    pub fn lib(mut self, lib: impl Into<String>) -> Self {
        self.lib = Some(lib.into());
        self
    }

    pub fn mode(mut self, mode: CallMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn error(mut self, error: ErrorMode) -> Self {
        self.error = error;
        self
    }

    /// Append a parameter with the default `both` direction.
    pub fn parm(self, child: impl Into<PgmChild>) -> Self {
        self.parm_io(child, IoMode::default())
    }

    pub fn parm_io(mut self, child: impl Into<PgmChild>, io: IoMode) -> Self {
        let label = format!("p{}", self.parms.len() + 1);
        self.parms.push(Parm {
            label,
            io,
            by: None,
            child: child.into(),
        });
        self
    }

    pub fn parm_pass(mut self, child: impl Into<PgmChild>, io: IoMode, by: PassBy) -> Self {
        let label = format!("p{}", self.parms.len() + 1);
        self.parms.push(Parm {
            label,
            io,
            by: Some(by),
            child: child.into(),
        });
        self
    }

    fn push_ret(&mut self, child: PgmChild) {
        let label = format!("r{}", self.rets.len() + 1);
        self.rets.push((label, child));
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<pgm");
        push_attr(out, "name", &self.name);
        if let Some(lib) = &self.lib {
            push_attr(out, "lib", lib);
        }
        if let Some(func) = &self.func {
            push_attr(out, "func", func);
        }
        if let Some(mode) = self.mode {
            push_attr(out, "mode", &mode.to_string());
        }
        push_attr(out, "error", &self.error.to_string());
        push_attr(out, "var", &self.key);
        out.push('>');
        for parm in &self.parms {
            parm.write_xml(out);
        }
        for (label, child) in &self.rets {
            out.push_str("<return");
            push_attr(out, "var", label);
            out.push('>');
            child.write_xml(out);
            out.push_str("</return>");
        }
        out.push_str("</pgm>");
    }
}

/// `*SRVPGM` call: a program call plus an exported function and return
/// slots. Return slots get their own `r1`, `r2`, … label sequence, parallel
/// to but distinct from the parameter labels.
#[derive(Debug, Clone)]
pub struct SrvPgm {
    inner: Pgm,
}

impl SrvPgm {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        func: impl Into<String>,
    ) -> Self {
        let mut inner = Pgm::new(key, name);
        inner.func = Some(func.into());
        SrvPgm { inner }
    }

    pub fn lib(mut self, lib: impl Into<String>) -> Self {
        self.inner = self.inner.lib(lib);
        self
    }

    pub fn mode(mut self, mode: CallMode) -> Self {
        self.inner = self.inner.mode(mode);
        self
    }

    pub fn error(mut self, error: ErrorMode) -> Self {
        self.inner = self.inner.error(error);
        self
    }

    pub fn parm(mut self, child: impl Into<PgmChild>) -> Self {
        self.inner = self.inner.parm(child);
        self
    }

    pub fn parm_io(mut self, child: impl Into<PgmChild>, io: IoMode) -> Self {
        self.inner = self.inner.parm_io(child, io);
        self
    }

    /// Append a return slot (`r1`, `r2`, …).
    pub fn ret(mut self, child: impl Into<PgmChild>) -> Self {
        self.inner.push_ret(child.into());
        self
    }

    fn write_xml(&self, out: &mut String) {
        self.inner.write_xml(out);
    }
}

/// Optional connection / statement / options labels shared by the SQL verbs.
/// Labels let one request hold several independent statement sessions.
#[derive(Debug, Clone, Default)]
struct SqlLabels {
    conn: Option<String>,
    stmt: Option<String>,
    options: Option<String>,
}

impl SqlLabels {
    fn write_attrs(&self, out: &mut String) {
        if let Some(conn) = &self.conn {
            push_attr(out, "conn", conn);
        }
        if let Some(stmt) = &self.stmt {
            push_attr(out, "stmt", stmt);
        }
        if let Some(options) = &self.options {
            push_attr(out, "options", options);
        }
    }
}

macro_rules! sql_label_methods {
    () => {
        pub fn conn(mut self, label: impl Into<String>) -> Self {
            self.labels.conn = Some(label.into());
            self
        }

        pub fn stmt(mut self, label: impl Into<String>) -> Self {
            self.labels.stmt = Some(label.into());
            self
        }

        pub fn options(mut self, label: impl Into<String>) -> Self {
            self.labels.options = Some(label.into());
            self
        }

        pub fn error(mut self, error: ErrorMode) -> Self {
            self.error = error;
            self
        }
    };
}

/// Execute a literal SQL statement directly.
#[derive(Debug, Clone)]
pub struct SqlQuery {
    key: String,
    sql: String,
    labels: SqlLabels,
    error: ErrorMode,
}

impl SqlQuery {
    pub fn new(key: impl Into<String>, sql: impl Into<String>) -> Self {
        SqlQuery {
            key: key.into(),
            sql: sql.into(),
            labels: SqlLabels::default(),
            error: ErrorMode::default(),
        }
    }

    sql_label_methods!();

    fn write_xml(&self, out: &mut String) {
        write_sql_stmt(out, &self.key, "query", &self.sql, &self.labels, self.error);
    }
}

/// Prepare a statement under a label for later [`SqlExecute`].
#[derive(Debug, Clone)]
pub struct SqlPrepare {
    key: String,
    sql: String,
    labels: SqlLabels,
    error: ErrorMode,
}

impl SqlPrepare {
    pub fn new(key: impl Into<String>, sql: impl Into<String>) -> Self {
        SqlPrepare {
            key: key.into(),
            sql: sql.into(),
            labels: SqlLabels::default(),
            error: ErrorMode::default(),
        }
    }

    sql_label_methods!();

    fn write_xml(&self, out: &mut String) {
        write_sql_stmt(
            out,
            &self.key,
            "prepare",
            &self.sql,
            &self.labels,
            self.error,
        );
    }
}

/// One bind parameter of an [`SqlExecute`].
#[derive(Debug, Clone)]
pub struct SqlParm {
    key: String,
    value: String,
    io: IoMode,
}

impl SqlParm {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        SqlParm {
            key: key.into(),
            value: value.into(),
            io: IoMode::default(),
        }
    }

    pub fn io(mut self, io: IoMode) -> Self {
        self.io = io;
        self
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<parm");
        push_attr(out, "io", &self.io.to_string());
        push_attr(out, "var", &self.key);
        out.push('>');
        push_cdata(out, &self.value);
        out.push_str("</parm>");
    }
}

/// Execute a prepared statement with an ordered set of bind parameters.
#[derive(Debug, Clone)]
pub struct SqlExecute {
    key: String,
    labels: SqlLabels,
    error: ErrorMode,
    parms: Vec<SqlParm>,
}

impl SqlExecute {
    pub fn new(key: impl Into<String>) -> Self {
        SqlExecute {
            key: key.into(),
            labels: SqlLabels::default(),
            error: ErrorMode::default(),
            parms: Vec::new(),
        }
    }

    sql_label_methods!();

    pub fn parm(mut self, parm: SqlParm) -> Self {
        self.parms.push(parm);
        self
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<sql");
        push_attr(out, "var", &self.key);
        out.push('>');
        out.push_str("<execute");
        self.labels.write_attrs(out);
        push_attr(out, "error", &self.error.to_string());
        push_attr(out, "var", &self.key);
        out.push('>');
        for parm in &self.parms {
            parm.write_xml(out);
        }
        out.push_str("</execute></sql>");
    }
}

/// Row blocking for [`SqlFetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchBlock {
    #[default]
    All,
    Rows(u32),
}

impl fmt::Display for FetchBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchBlock::All => write!(f, "all"),
            FetchBlock::Rows(n) => write!(f, "{}", n),
        }
    }
}

/// Fetch rows from an open statement.
#[derive(Debug, Clone)]
pub struct SqlFetch {
    key: String,
    stmt: Option<String>,
    block: FetchBlock,
    rec: Option<u32>,
    desc: Option<bool>,
    error: ErrorMode,
}

impl SqlFetch {
    pub fn new(key: impl Into<String>) -> Self {
        SqlFetch {
            key: key.into(),
            stmt: None,
            block: FetchBlock::default(),
            rec: None,
            desc: None,
            error: ErrorMode::default(),
        }
    }

    pub fn stmt(mut self, label: impl Into<String>) -> Self {
        self.stmt = Some(label.into());
        self
    }

    pub fn block(mut self, block: FetchBlock) -> Self {
        self.block = block;
        self
    }

    pub fn rec(mut self, n: u32) -> Self {
        self.rec = Some(n);
        self
    }

    /// Whether column descriptors accompany the rows.
    pub fn desc(mut self, on: bool) -> Self {
        self.desc = Some(on);
        self
    }

    pub fn error(mut self, error: ErrorMode) -> Self {
        self.error = error;
        self
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<sql");
        push_attr(out, "var", &self.key);
        out.push('>');
        out.push_str("<fetch");
        if let Some(stmt) = &self.stmt {
            push_attr(out, "stmt", stmt);
        }
        push_attr(out, "block", &self.block.to_string());
        if let Some(n) = self.rec {
            push_attr(out, "rec", &n.to_string());
        }
        if let Some(on) = self.desc {
            push_attr(out, "desc", if on { "on" } else { "off" });
        }
        push_attr(out, "error", &self.error.to_string());
        push_attr(out, "var", &self.key);
        out.push_str("></fetch></sql>");
    }
}

/// Which handles an [`SqlFree`] releases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreeTarget {
    All,
    Label(String),
}

impl fmt::Display for FreeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreeTarget::All => write!(f, "all"),
            FreeTarget::Label(label) => write!(f, "{}", label),
        }
    }
}

/// Release open connection / statement / options handles.
#[derive(Debug, Clone)]
pub struct SqlFree {
    key: String,
    conn: Option<FreeTarget>,
    cstmt: Option<String>,
    stmt: Option<FreeTarget>,
    options: Option<FreeTarget>,
    error: ErrorMode,
}

impl SqlFree {
    pub fn new(key: impl Into<String>) -> Self {
        SqlFree {
            key: key.into(),
            conn: None,
            cstmt: None,
            stmt: None,
            options: None,
            error: ErrorMode::default(),
        }
    }

    pub fn conn(mut self, target: FreeTarget) -> Self {
        self.conn = Some(target);
        self
    }

    /// Free the statements of one connection label.
    pub fn cstmt(mut self, label: impl Into<String>) -> Self {
        self.cstmt = Some(label.into());
        self
    }

    pub fn stmt(mut self, target: FreeTarget) -> Self {
        self.stmt = Some(target);
        self
    }

    pub fn options(mut self, target: FreeTarget) -> Self {
        self.options = Some(target);
        self
    }

    pub fn error(mut self, error: ErrorMode) -> Self {
        self.error = error;
        self
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<sql");
        push_attr(out, "var", &self.key);
        out.push('>');
        out.push_str("<free");
        if let Some(conn) = &self.conn {
            push_attr(out, "conn", &conn.to_string());
        }
        if let Some(cstmt) = &self.cstmt {
            push_attr(out, "cstmt", cstmt);
        }
        if let Some(stmt) = &self.stmt {
            push_attr(out, "stmt", &stmt.to_string());
        }
        if let Some(options) = &self.options {
            push_attr(out, "options", &options.to_string());
        }
        push_attr(out, "error", &self.error.to_string());
        push_attr(out, "var", &self.key);
        out.push_str("></free></sql>");
    }
}

fn write_sql_stmt(
    out: &mut String,
    key: &str,
    verb: &str,
    body: &str,
    labels: &SqlLabels,
    error: ErrorMode,
) {
    out.push_str("<sql");
    push_attr(out, "var", key);
    out.push('>');
    out.push('<');
    out.push_str(verb);
    labels.write_attrs(out);
    push_attr(out, "error", &error.to_string());
    push_attr(out, "var", key);
    out.push('>');
    push_cdata(out, body);
    out.push_str("</");
    out.push_str(verb);
    out.push_str("></sql>");
}

/// Caller-supplied literal markup, passed through opaquely when no
/// structured operation covers a gateway feature.
///
/// It accepts no children; the markup is validated once at construction and
/// a malformed snippet fails right there with the text attached.
#[derive(Debug, Clone)]
pub struct RawXml {
    xml: String,
}

impl RawXml {
    pub fn new(xml: impl Into<String>) -> Result<Self, ToolkitError> {
        let xml = xml.into();
        if let Err(source) = Document::parse(&xml) {
            return Err(ToolkitError::MalformedRawXml {
                snippet: xml,
                source,
            });
        }
        Ok(RawXml { xml })
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str(&self.xml);
    }
}

/// Closed set of operation kinds, with one exhaustive serialization.
#[derive(Debug, Clone)]
pub enum Operation {
    Cmd(Cmd),
    Sh(Sh),
    Pgm(Pgm),
    SrvPgm(SrvPgm),
    SqlQuery(SqlQuery),
    SqlPrepare(SqlPrepare),
    SqlExecute(SqlExecute),
    SqlFetch(SqlFetch),
    SqlFree(SqlFree),
    Raw(RawXml),
}

impl Operation {
    /// Correlation key, or `None` for raw markup (which the decoder keys by
    /// whatever the markup itself declares).
    pub fn key(&self) -> Option<&str> {
        match self {
            Operation::Cmd(op) => Some(&op.key),
            Operation::Sh(op) => Some(&op.key),
            Operation::Pgm(op) => Some(&op.key),
            Operation::SrvPgm(op) => Some(&op.inner.key),
            Operation::SqlQuery(op) => Some(&op.key),
            Operation::SqlPrepare(op) => Some(&op.key),
            Operation::SqlExecute(op) => Some(&op.key),
            Operation::SqlFetch(op) => Some(&op.key),
            Operation::SqlFree(op) => Some(&op.key),
            Operation::Raw(_) => None,
        }
    }

    pub(crate) fn write_xml(&self, out: &mut String) {
        match self {
            Operation::Cmd(op) => op.write_xml(out),
            Operation::Sh(op) => op.write_xml(out),
            Operation::Pgm(op) => op.write_xml(out),
            Operation::SrvPgm(op) => op.write_xml(out),
            Operation::SqlQuery(op) => op.write_xml(out),
            Operation::SqlPrepare(op) => op.write_xml(out),
            Operation::SqlExecute(op) => op.write_xml(out),
            Operation::SqlFetch(op) => op.write_xml(out),
            Operation::SqlFree(op) => op.write_xml(out),
            Operation::Raw(op) => op.write_xml(out),
        }
    }
}

macro_rules! op_from {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for Operation {
            fn from(op: $ty) -> Self {
                Operation::$variant(op)
            }
        }
    };
}

op_from!(Cmd, Cmd);
op_from!(Sh, Sh);
op_from!(Pgm, Pgm);
op_from!(SrvPgm, SrvPgm);
op_from!(SqlQuery, SqlQuery);
op_from!(SqlPrepare, SqlPrepare);
op_from!(SqlExecute, SqlExecute);
op_from!(SqlFetch, SqlFetch);
op_from!(SqlFree, SqlFree);
op_from!(Raw, RawXml);
