//! End-to-end request/reply flows against a canned transport, exercising
//! the same reply shapes XMLSERVICE produces on the host.

use anyhow::Result;
use itoolkit::{
    Cmd, Data, Ds, FetchBlock, HostType, ParseTier, Pgm, Reply, Sh, SqlFetch, SqlQuery, SrvPgm,
    TagPolicy, Toolkit, Transport,
};

struct Canned(&'static str);

impl Transport for Canned {
    fn call(&self, _request_xml: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Transport double that records the request it was handed.
struct Capture(std::cell::RefCell<String>);

impl Transport for Capture {
    fn call(&self, request_xml: &str) -> Result<String> {
        *self.0.borrow_mut() = request_xml.to_string();
        Ok("<?xml version='1.0'?><xmlservice></xmlservice>".to_string())
    }
}

#[test]
fn request_envelope_carries_all_operations() {
    let transport = Capture(Default::default());
    let mut kit = Toolkit::new();
    kit.add(Cmd::new("chglibl", "CHGLIBL LIBL(XMLSERVICE)"));
    kit.add(Sh::new("ps", "ps -ef"));
    kit.add(
        Pgm::new("zzcall", "ZZCALL")
            .lib("XMLSERVICE")
            .parm(Data::new("var1", HostType::char(1), "a"))
            .parm(Data::new("var4", HostType::packed(12, 2), "33.33"))
            .parm(
                Ds::new("var5")
                    .data(Data::new("d5var1", HostType::char(1), "a"))
                    .data(Data::new("d5var4", HostType::packed(12, 2), "33.33")),
            ),
    );
    kit.call(&transport).unwrap();

    let sent = transport.0.borrow();
    assert!(sent.starts_with("<?xml version='1.0'?>\n<xmlservice>"));
    assert!(sent.contains("<cmd exec='cmd' error='fast' var='chglibl'>"));
    assert!(sent.contains("<sh error='fast' var='ps'>"));
    assert!(sent.contains("<pgm name='ZZCALL' lib='XMLSERVICE' error='fast' var='zzcall'>"));
    assert!(sent.contains("<parm io='both' var='p3'><ds var='var5'>"));
    assert!(sent.contains("<data type='12p2' var='d5var4'><![CDATA[33.33]]></data>"));
}

const ZZCALL_REPLY: &str = "<?xml version='1.0'?>\
<xmlservice>\
<pgm name='ZZCALL' lib='XMLSERVICE' error='fast' var='zzcall'>\
<parm io='both' var='p1'><data type='1a' var='INCHARA'>C</data></parm>\
<parm io='both' var='p2'><data type='7p4' var='INDEC1'>321.1234</data></parm>\
<parm io='both' var='p3'>\
<ds var='var5'>\
<data type='1a' var='d5var1'>E</data>\
<data type='12p2' var='d5var4'>2133.21</data>\
</ds>\
</parm>\
<success>+++ success XMLSERVICE ZZCALL</success>\
</pgm>\
</xmlservice>";

#[test]
fn program_reply_dict_shape() {
    let mut kit = Toolkit::new();
    kit.add(Pgm::new("zzcall", "ZZCALL").lib("XMLSERVICE"));
    kit.call(&Canned(ZZCALL_REPLY)).unwrap();

    let zzcall = kit.dict_at("zzcall");
    assert_eq!(zzcall.get("INCHARA").and_then(Reply::as_text), Some("C"));
    assert_eq!(
        zzcall.get("INDEC1").and_then(Reply::as_text),
        Some("321.1234")
    );
    // ds surfaces as a nested container by default.
    let ds = zzcall.get("var5").and_then(Reply::as_map).unwrap();
    assert_eq!(ds.get("d5var1").and_then(Reply::as_text), Some("E"));
    assert_eq!(ds.get("d5var4").and_then(Reply::as_text), Some("2133.21"));
    assert_eq!(
        zzcall.get("success").and_then(Reply::as_text),
        Some("+++ success XMLSERVICE ZZCALL")
    );
}

#[test]
fn program_reply_list_shape_preserves_order() {
    let mut kit = Toolkit::new();
    kit.add(Pgm::new("zzcall", "ZZCALL").lib("XMLSERVICE"));
    kit.call(&Canned(ZZCALL_REPLY)).unwrap();

    let list = kit.list_out();
    assert_eq!(list.len(), 1);
    let pgm = list[0].as_list().unwrap();
    assert_eq!(pgm[0].as_text(), Some("C"));
    assert_eq!(pgm[1].as_text(), Some("321.1234"));
    let ds = pgm[2].as_list().unwrap();
    assert_eq!(ds[0].as_text(), Some("E"));
    assert_eq!(ds[1].as_text(), Some("2133.21"));
    assert_eq!(pgm[3].as_text(), Some("+++ success XMLSERVICE ZZCALL"));
}

#[test]
fn program_reply_hybrid_shape_collects_leaf_data() {
    let mut kit = Toolkit::new();
    kit.add(Pgm::new("zzcall", "ZZCALL").lib("XMLSERVICE"));
    kit.call(&Canned(ZZCALL_REPLY)).unwrap();

    let zzcall = kit.hybrid_at("zzcall");
    let data = zzcall.get("data").and_then(Reply::as_list).unwrap();
    assert_eq!(data[0].as_text(), Some("C"));
    assert_eq!(data[1].as_text(), Some("321.1234"));
    assert_eq!(data[2].as_text(), Some("+++ success XMLSERVICE ZZCALL"));
    let ds = zzcall.get("var5").and_then(Reply::as_map).unwrap();
    let ds_data = ds.get("data").and_then(Reply::as_list).unwrap();
    assert_eq!(ds_data.len(), 2);
}

#[test]
fn srvpgm_return_slot_decodes_under_its_label() {
    let mut kit = Toolkit::with_policy(TagPolicy {
        ret: true,
        ..TagPolicy::default()
    });
    kit.add(
        SrvPgm::new("vary", "ZZSRV", "ZZVARY4")
            .lib("XMLSERVICE")
            .parm(Data::new("myName", HostType::char(10), "ranger"))
            .ret(Data::new("myResult", HostType::char(20), "")),
    );
    kit.call(&Canned(
        "<?xml version='1.0'?>\
         <xmlservice>\
         <pgm name='ZZSRV' func='ZZVARY4' var='vary'>\
         <parm io='both' var='p1'><data type='10a' var='myName'>ranger</data></parm>\
         <return var='r1'><data type='20a' var='myResult'>my name is ranger</data></return>\
         <success>+++ success</success>\
         </pgm>\
         </xmlservice>",
    ))
    .unwrap();

    let vary = kit.dict_at("vary");
    let ret = vary.get("r1").and_then(Reply::as_map).unwrap();
    assert_eq!(
        ret.get("myResult").and_then(Reply::as_text),
        Some("my name is ranger")
    );
}

#[test]
fn sql_fetch_rows_promote_to_list() {
    let mut kit = Toolkit::new();
    kit.add(SqlQuery::new("custquery", "select LSTNAM from QIWS.QCUSTCDT"));
    kit.add(SqlFetch::new("custfetch").block(FetchBlock::All));
    kit.call(&Canned(
        "<?xml version='1.0'?>\
         <xmlservice>\
         <sql var='custquery'><query error='fast' var='custquery'><success>+++ success</success></query></sql>\
         <sql var='custfetch'>\
         <row><data desc='LSTNAM'>Jones</data></row>\
         <row><data desc='LSTNAM'>Vine</data></row>\
         </sql>\
         </xmlservice>",
    ))
    .unwrap();

    let fetch = kit.dict_at("custfetch");
    let rows = fetch.get("row").and_then(Reply::as_list).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("LSTNAM").and_then(Reply::as_text), Some("Jones"));
    assert_eq!(rows[1].get("LSTNAM").and_then(Reply::as_text), Some("Vine"));
}

#[test]
fn job_metadata_fields_surface_as_values() {
    let mut kit = Toolkit::new();
    kit.add(Cmd::new("c", "DSPLIBL"));
    kit.call(&Canned(
        "<?xml version='1.0'?>\
         <xmlservice>\
         <cmd var='c'><success>ok</success></cmd>\
         <jobinfo>\
         <jobname>QSQSRVR</jobname>\
         <jobuser>QUSER</jobuser>\
         <jobnbr>133702</jobnbr>\
         </jobinfo>\
         </xmlservice>",
    ))
    .unwrap();

    // jobinfo is transparent; its value-tag children land at the top level.
    let dict = kit.dict_out();
    assert_eq!(dict.get("jobname").and_then(Reply::as_text), Some("QSQSRVR"));
    assert_eq!(dict.get("jobuser").and_then(Reply::as_text), Some("QUSER"));
    assert_eq!(dict.get("jobnbr").and_then(Reply::as_text), Some("133702"));
}

#[test]
fn malformed_reply_never_raises() {
    let mut kit = Toolkit::new();
    kit.add(Cmd::new("c", "DSPLIBL"));
    kit.call(&Canned("<bad & worse <<")).unwrap();
    assert_eq!(kit.parse_tier(), Some(ParseTier::BadParse));
    let dict = kit.dict_out();
    assert_eq!(
        dict.get("error").and_then(Reply::as_text),
        Some(itoolkit::BADPARSE)
    );
    // The sanitized original rides along for diagnostics.
    let diag = dict.get("error1").and_then(Reply::as_text).unwrap();
    assert!(diag.contains("bad & worse"));
}

#[test]
fn reply_converts_to_json_with_order_intact() {
    let mut kit = Toolkit::new();
    kit.add(Cmd::new("c", "DSPLIBL"));
    kit.call(&Canned(
        "<?xml version='1.0'?><xmlservice><cmd var='c'><success>ok</success></cmd></xmlservice>",
    ))
    .unwrap();
    let json = kit.dict_at("c").to_json();
    assert_eq!(json["success"], "ok");
}
