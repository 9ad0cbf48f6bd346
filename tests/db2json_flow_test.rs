//! DB2JSON wire-shape flows: what the collector hands a JSON transport and
//! how the gateway's reply comes back.

use anyhow::Result;
use itoolkit::{JsonCommand, JsonProgram, JsonToolkit, JsonTransport, Param};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::cell::RefCell;

struct Capture {
    seen: RefCell<Value>,
    reply: Value,
}

impl Capture {
    fn replying(reply: Value) -> Self {
        Capture {
            seen: RefCell::new(Value::Null),
            reply,
        }
    }
}

impl JsonTransport for Capture {
    fn execute(&self, payload: &Value) -> Result<Value> {
        *self.seen.borrow_mut() = payload.clone();
        Ok(self.reply.clone())
    }
}

#[test]
fn program_call_payload_matches_gateway_shape() {
    let transport = Capture::replying(json!({"script": []}));
    let mut kit = JsonToolkit::new();
    kit.add(
        JsonProgram::new("ZZCALL", "XMLSERVICE")
            .param(Param::character("INCHARA", 1, "a"))
            .param(Param::packed("INDEC1", 7, 4, Decimal::new(321_1234, 4))),
    );
    kit.execute(&transport).unwrap();

    let sent = transport.seen.borrow();
    assert_eq!(
        *sent,
        json!([{"pgm": [
            {"name": "ZZCALL", "lib": "XMLSERVICE"},
            {"s": [
                {"name": "INCHARA", "type": "1a", "value": "a"},
                {"name": "INDEC1", "type": "7p4", "value": "321.1234"}
            ]}
        ]}])
    );
}

#[test]
fn service_call_carries_function_and_return_slot() {
    let transport = Capture::replying(json!({"script": []}));
    let mut kit = JsonToolkit::new();
    kit.add(
        JsonProgram::service("ZZSRV", "XMLSERVICE", "ZZARRAY")
            .param(Param::character("myName", 10, "ranger"))
            .param(Param::integer("myMax", 10, 5).by_value())
            .ret(Param::character("myResult", 20, "")),
    );
    kit.execute(&transport).unwrap();

    let sent = transport.seen.borrow();
    let header = &sent[0]["pgm"][0];
    assert_eq!(header["func"], "ZZARRAY");
    let params = sent[0]["pgm"][1]["s"].as_array().unwrap();
    assert_eq!(params[1]["by"], "val");
    assert_eq!(params[2]["by"], "return");
}

#[test]
fn single_param_is_bare_not_listed() {
    let transport = Capture::replying(json!({"script": []}));
    let mut kit = JsonToolkit::new();
    kit.add(JsonProgram::new("HELLO", "DB2JSON").param(Param::character("CHAR", 32, "Hi")));
    kit.execute(&transport).unwrap();

    let sent = transport.seen.borrow();
    assert_eq!(
        sent[0]["pgm"][1]["s"],
        json!({"name": "CHAR", "type": "32a", "value": "Hi"})
    );
}

#[test]
fn command_facility_selection() {
    let transport = Capture::replying(json!({"script": []}));
    let mut kit = JsonToolkit::new();
    kit.add(JsonCommand::new("CRTLIB LIB(TEST)"));
    kit.add(JsonCommand::new("RTVJOBA USRLIBL(?) SYSLIBL(?)"));
    kit.add(JsonCommand::new("ls -l").screen_output(true));
    kit.execute(&transport).unwrap();

    let sent = transport.seen.borrow();
    let ops = sent.as_array().unwrap();
    assert_eq!(ops[0], json!({"cmd": {"exec": "CRTLIB LIB(TEST)"}}));
    assert_eq!(
        ops[1],
        json!({"cmd": {"rexx": "RTVJOBA USRLIBL(?) SYSLIBL(?)"}})
    );
    assert_eq!(ops[2], json!({"cmd": {"qsh": "ls -l"}}));
}

#[test]
fn execute_consumes_input_and_returns_reply() {
    let transport = Capture::replying(json!({"script": [{"cmd": {"success": true}}]}));
    let mut kit = JsonToolkit::new();
    kit.add(JsonCommand::new("CRTLIB LIB(TEST)"));
    let reply = kit.execute(&transport).unwrap();
    assert_eq!(reply["script"][0]["cmd"]["success"], true);

    // A second execute sends an empty batch, not the old one.
    kit.execute(&transport).unwrap();
    assert_eq!(*transport.seen.borrow(), json!([]));
}

struct Failing;

impl JsonTransport for Failing {
    fn execute(&self, _payload: &Value) -> Result<Value> {
        anyhow::bail!("connection refused")
    }
}

#[test]
fn failed_execute_still_consumes_input() {
    let mut kit = JsonToolkit::new();
    kit.add(JsonCommand::new("CRTLIB LIB(TEST)"));
    assert!(kit.execute(&Failing).is_err());
    assert_eq!(kit.payload(), json!([]));
}
