//! DB2JSON wire format.
//!
//! The JSON gateway family takes a list of payload objects instead of XML: a
//! program call is `{"pgm": [{"name":.., "lib":..}, {"s": <param or list>}]}`
//! and each parameter is `{"name":.., "type":.., "value":.., "by":..}` with
//! the same `<length><category><scale>` type strings as the XML side.

use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::error::ToolkitError;
use crate::transport::JsonTransport;
use crate::types::HostType;

/// Parameter passing marker, emitted as the `by` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum By {
    Val,
    Return,
}

/// One typed parameter of a JSON program call.
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    ty: HostType,
    value: Value,
    by: Option<By>,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: HostType, value: impl Into<Value>) -> Self {
        Param {
            name: name.into(),
            ty,
            value: value.into(),
            by: None,
        }
    }

    pub fn character(name: impl Into<String>, length: u32, value: impl Into<String>) -> Self {
        Param::new(name, HostType::char(length), value.into())
    }

    pub fn integer(name: impl Into<String>, length: u32, value: i64) -> Self {
        Param::new(name, HostType::int(length), value)
    }

    pub fn unsigned(name: impl Into<String>, length: u32, value: u64) -> Self {
        Param::new(name, HostType::uint(length), value)
    }

    /// Packed decimal. The value travels as its exact decimal string rather
    /// than a lossy float.
    pub fn packed(name: impl Into<String>, length: u32, scale: u32, value: Decimal) -> Self {
        Param::new(name, HostType::packed(length, scale), value.to_string())
    }

    /// Zoned (signed) decimal, same string encoding as [`Param::packed`].
    pub fn zoned(name: impl Into<String>, length: u32, scale: u32, value: Decimal) -> Self {
        Param::new(name, HostType::zoned(length, scale), value.to_string())
    }

    pub fn float(name: impl Into<String>, length: u32, precision: u32, value: f64) -> Self {
        Param::new(name, HostType::float(length, precision), value)
    }

    /// Binary data, hex-encoded by the caller.
    pub fn binary(name: impl Into<String>, length: u32, hex: impl Into<String>) -> Self {
        Param::new(name, HostType::binary(length), hex.into())
    }

    /// Pass by value.
    pub fn by_value(mut self) -> Self {
        self.by = Some(By::Val);
        self
    }

    /// Mark as the call's return slot.
    pub fn as_return(mut self) -> Self {
        self.by = Some(By::Return);
        self
    }

    pub fn to_value(&self) -> Value {
        let mut obj = json!({
            "name": self.name,
            "type": self.ty.to_string(),
            "value": self.value,
        });
        match self.by {
            Some(By::Return) => {
                obj["by"] = Value::String("return".to_string());
            }
            Some(By::Val) => {
                obj["by"] = Value::String("val".to_string());
            }
            None => {}
        }
        obj
    }
}

/// JSON program or service-program call.
#[derive(Debug, Clone)]
pub struct JsonProgram {
    name: String,
    lib: String,
    func: Option<String>,
    params: Vec<Param>,
}

impl JsonProgram {
    pub fn new(name: impl Into<String>, lib: impl Into<String>) -> Self {
        JsonProgram {
            name: name.into(),
            lib: lib.into(),
            func: None,
            params: Vec::new(),
        }
    }

    /// Service program: adds the exported function name.
    pub fn service(
        name: impl Into<String>,
        lib: impl Into<String>,
        func: impl Into<String>,
    ) -> Self {
        let mut pgm = JsonProgram::new(name, lib);
        pgm.func = Some(func.into());
        pgm
    }

    /// Append a parameter, preserving order.
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Append the return slot of a service-program call.
    pub fn ret(self, param: Param) -> Self {
        self.param(param.as_return())
    }

    pub fn to_value(&self) -> Value {
        let mut head = json!({ "name": self.name, "lib": self.lib });
        if let Some(func) = &self.func {
            head["func"] = Value::String(func.clone());
        }
        // One parameter rides bare; several ride as a list.
        let s = if self.params.len() == 1 {
            self.params[0].to_value()
        } else {
            Value::Array(self.params.iter().map(Param::to_value).collect())
        };
        json!({ "pgm": [head, { "s": s }] })
    }
}

/// JSON CL command. A `?` or `&` placeholder selects the REXX facility;
/// `screen_output` routes through qsh to capture display output.
#[derive(Debug, Clone)]
pub struct JsonCommand {
    command: String,
    screen_output: bool,
}

impl JsonCommand {
    pub fn new(command: impl Into<String>) -> Self {
        JsonCommand {
            command: command.into(),
            screen_output: false,
        }
    }

    pub fn screen_output(mut self, on: bool) -> Self {
        self.screen_output = on;
        self
    }

    pub fn to_value(&self) -> Value {
        let facility = if self.screen_output {
            "qsh"
        } else if self.command.contains('?') || self.command.contains('&') {
            "rexx"
        } else {
            "exec"
        };
        let mut cmd = serde_json::Map::new();
        cmd.insert(facility.to_string(), Value::String(self.command.clone()));
        json!({ "cmd": cmd })
    }
}

/// One JSON payload entry.
#[derive(Debug, Clone)]
pub enum JsonOp {
    Program(JsonProgram),
    Command(JsonCommand),
    /// Caller-supplied payload object, passed through opaquely.
    Raw(Value),
}

impl JsonOp {
    fn to_value(&self) -> Value {
        match self {
            JsonOp::Program(pgm) => pgm.to_value(),
            JsonOp::Command(cmd) => cmd.to_value(),
            JsonOp::Raw(value) => value.clone(),
        }
    }
}

impl From<JsonProgram> for JsonOp {
    fn from(pgm: JsonProgram) -> Self {
        JsonOp::Program(pgm)
    }
}

impl From<JsonCommand> for JsonOp {
    fn from(cmd: JsonCommand) -> Self {
        JsonOp::Command(cmd)
    }
}

impl From<Value> for JsonOp {
    fn from(value: Value) -> Self {
        JsonOp::Raw(value)
    }
}

/// Ordered collector for the JSON wire format, mirroring
/// [`crate::toolkit::Toolkit`] for the DB2JSON family.
#[derive(Debug, Default)]
pub struct JsonToolkit {
    ops: Vec<JsonOp>,
}

impl JsonToolkit {
    pub fn new() -> Self {
        JsonToolkit::default()
    }

    pub fn add(&mut self, op: impl Into<JsonOp>) {
        self.ops.push(op.into());
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// The accumulated payload: a list of payload objects.
    pub fn payload(&self) -> Value {
        Value::Array(self.ops.iter().map(JsonOp::to_value).collect())
    }

    /// Execute through a transport. The accumulated operations are consumed
    /// either way the transport call goes; the gateway's decoded reply is
    /// passed through unchanged.
    pub fn execute(&mut self, transport: &dyn JsonTransport) -> Result<Value, ToolkitError> {
        let payload = self.payload();
        tracing::debug!(ops = self.ops.len(), "executing json payload");
        self.ops.clear();
        let reply = transport.execute(&payload)?;
        Ok(reply)
    }
}
