//! Request builder and reply selectors.
//!
//! A [`Toolkit`] owns an ordered sequence of operations, serializes them
//! into one `<xmlservice>` envelope, ships it through a [`Transport`], and
//! keeps the decoded reply until the next call or [`Toolkit::clear`]. One
//! instance is single-threaded by design: it has no interior locking, and
//! two independent instances share nothing.

use tracing::debug;

use crate::decode::{self, DecodedReply, ParseTier, TagPolicy};
use crate::error::ToolkitError;
use crate::ops::Operation;
use crate::reply::{Reply, ReplyMap};
use crate::trace::{TraceSink, TraceTarget};
use crate::transport::Transport;

/// XMLSERVICE request collector and reply decoder.
pub struct Toolkit {
    policy: TagPolicy,
    input: Vec<Operation>,
    reply: Option<DecodedReply>,
    trace: TraceSink,
}

impl Default for Toolkit {
    fn default() -> Self {
        Toolkit::new()
    }
}

impl Toolkit {
    pub fn new() -> Self {
        Toolkit::with_policy(TagPolicy::default())
    }

    /// Choose which reply tags surface as containers/values (`parm`,
    /// `return`, `ds`, `row` opt-ins).
    pub fn with_policy(policy: TagPolicy) -> Self {
        Toolkit {
            policy,
            input: Vec::new(),
            reply: None,
            trace: TraceSink::Disabled,
        }
    }

    /// Append an operation. Keys are trusted to be unique per request;
    /// the decoder tolerates repeats by suffixing (see the dict walk).
    pub fn add(&mut self, op: impl Into<Operation>) {
        self.input.push(op.into());
    }

    /// Back to the construction-time empty state: no operations, no reply.
    pub fn clear(&mut self) {
        self.input.clear();
        self.reply = None;
    }

    /// Serialize the accumulated operations into the request envelope.
    /// Stable and idempotent: serializing an unmutated toolkit twice yields
    /// identical text.
    pub fn xml_in(&self) -> String {
        let mut xml = String::from("<?xml version='1.0'?>\n<xmlservice>");
        for op in &self.input {
            op.write_xml(&mut xml);
        }
        xml.push_str("</xmlservice>\n");
        xml
    }

    /// One blocking round-trip: serialize, ship, decode. Transport failures
    /// are returned to the caller; decode problems never are — they become
    /// `*BADPARSE` / `*NOPARSE` markers inside the reply. The accumulated
    /// operations are consumed either way the transport call goes.
    pub fn call(&mut self, transport: &dyn Transport) -> Result<(), ToolkitError> {
        let request = self.xml_in();
        if self.trace.is_enabled() {
            self.trace.write("***********************");
            self.trace
                .write(&format!("control {}", chrono::Local::now().format("%c")));
            self.trace.write(&transport.describe());
            self.trace
                .write(&format!("input {}", chrono::Local::now().format("%c")));
            self.trace.write(&request);
        }
        debug!(ops = self.input.len(), bytes = request.len(), "calling gateway");
        self.input.clear();

        let raw = transport.call(&request)?;

        if self.trace.is_enabled() {
            self.trace
                .write(&format!("output {}", chrono::Local::now().format("%c")));
            self.trace.write(&raw);
        }
        let decoded = decode::decode(&raw);
        if decoded.tier != ParseTier::Clean && self.trace.is_enabled() {
            self.trace.write("parse (fail)");
            self.trace.hexdump(&raw);
        }
        if self.trace.is_enabled() {
            self.trace.write(&format!(
                "parse tier: {:?} (Clean-ok, BadParse-recovered, NoParse-gave up)",
                decoded.tier
            ));
        }
        self.reply = Some(decoded);
        Ok(())
    }

    /// The tier the last reply parsed at, if a call happened.
    pub fn parse_tier(&self) -> Option<ParseTier> {
        self.reply.as_ref().map(|r| r.tier)
    }

    /// Raw reply text (possibly a synthesized recovery envelope).
    pub fn xml_out(&mut self) -> String {
        self.decoded().xml().to_string()
    }

    /// Ordered-list shape: scalars and nested sequences, no keys.
    pub fn list_out(&mut self) -> Vec<Reply> {
        let policy = self.policy;
        self.decoded().to_list(&policy)
    }

    /// One entry of the list shape. An out-of-range index comes back as an
    /// error-wrapped view of the whole structure, never a panic.
    pub fn list_at(&mut self, index: usize) -> Reply {
        let mut list = self.list_out();
        if index < list.len() {
            list.swap_remove(index)
        } else {
            Reply::error_wrap(Reply::List(list))
        }
    }

    /// Keyed-dict shape: repeated container keys promote to lists,
    /// duplicate scalar keys gain numeric suffixes.
    pub fn dict_out(&mut self) -> ReplyMap {
        let policy = self.policy;
        self.decoded().to_dict(&policy)
    }

    /// One operation's slice of the dict shape, by correlation key. An
    /// absent key comes back as an error-wrapped view of the whole
    /// structure so partial results stay inspectable.
    pub fn dict_at(&mut self, key: &str) -> Reply {
        let mut dict = self.dict_out();
        match dict.shift_remove(key) {
            Some(value) => value,
            None => Reply::error_wrap(Reply::Map(dict)),
        }
    }

    /// Hybrid shape: keyed like the dict, with scalar leaves collected
    /// under each node's reserved `data` list.
    pub fn hybrid_out(&mut self) -> ReplyMap {
        let policy = self.policy;
        self.decoded().to_hybrid(&policy)
    }

    /// See [`Toolkit::dict_at`]; same selector contract.
    pub fn hybrid_at(&mut self, key: &str) -> Reply {
        let mut hybrid = self.hybrid_out();
        match hybrid.shift_remove(key) {
            Some(value) => value,
            None => Reply::error_wrap(Reply::Map(hybrid)),
        }
    }

    /// Open the trace sink. An already-open sink is closed first.
    pub fn trace_open(&mut self, target: TraceTarget) {
        self.trace.close();
        self.trace = TraceSink::open(target);
    }

    pub fn trace_write(&mut self, text: &str) {
        self.trace.write(text);
    }

    pub fn trace_hexdump(&mut self, data: &str) {
        self.trace.hexdump(data);
    }

    pub fn trace_close(&mut self) {
        self.trace.close();
    }

    /// The decoded reply, synthesizing the `no output` envelope when output
    /// is requested before any call.
    fn decoded(&mut self) -> &DecodedReply {
        let request = self.xml_in();
        self.reply
            .get_or_insert_with(|| decode::decode(&decode::no_output_envelope(&request)))
    }
}
