//! Build, sign and reconcile a manifest and its events end to end.

use mdfe_core::{Element, Environment, FiscalDateTime};
use mdfe_crypto::{digest_value, verify_signature, Ed25519DocumentSigner, Ed25519KeyPair, Signer};
use mdfe_document::{
    DriverInput, EmitInput, IdeInput, ManifestBuilder, PartyId, RoadInput, TotalsInput,
    VehicleInput,
};
use mdfe_protocol::{
    cancel_register, parse_authorization_response, parse_event_response, reconcile_authorization,
    reconcile_event, EventBody, EventKind, EventRequest, ProcessedKind, ReconcileError,
};
use mdfe_state::ContingencyHandle;

const KEY: &str = "41140581452880000139580010000000281611743166";

fn signer() -> Ed25519DocumentSigner {
    Ed25519DocumentSigner::new(Ed25519KeyPair::from_seed(&[7u8; 32]))
}

fn signed_manifest() -> Element {
    let mut b = ManifestBuilder::new(&ContingencyHandle::default());
    b.tag_ide(&IdeInput {
        uf_code: "41".into(),
        environment: "2".into(),
        issuer_type: "2".into(),
        series: "1".into(),
        number: "28".into(),
        control_number: "61174316".into(),
        modal: "1".into(),
        issued_at: Some("2014-05-20T10:00:00-03:00".into()),
        process: "0".into(),
        process_version: "1.0".into(),
        uf_start: "PR".into(),
        uf_end: "SC".into(),
        ..IdeInput::default()
    });
    b.tag_emit(&EmitInput {
        tax_id: Some(PartyId::Cnpj("81452880000139".into())),
        state_registration: "9012345678".into(),
        name: "TRANSPORTADORA TESTE".into(),
        ..EmitInput::default()
    });
    b.tag_rodo(&RoadInput::default());
    b.tag_veic_tracao(&VehicleInput {
        plate: "ABC1234".into(),
        tare: "5000".into(),
        wheel_type: "03".into(),
        body_type: "02".into(),
        ..VehicleInput::default()
    });
    b.tag_condutor(&DriverInput {
        name: "JOAO DA SILVA".into(),
        cpf: "12345678901".into(),
    });
    b.tag_tot(&TotalsInput {
        cargo_value: "1000.00".into(),
        weight_unit: "01".into(),
        gross_weight: "500.0000".into(),
        ..TotalsInput::default()
    });
    let doc = b.build().unwrap();
    signer().sign(doc.root(), "infMDFe").unwrap()
}

fn batch_response(status: u16, key: &str, digest: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<retConsReciMDFe xmlns="http://www.portalfiscal.inf.br/mdfe" versao="3.00">
  <tpAmb>2</tpAmb>
  <cStat>104</cStat>
  <xMotivo>Lote processado</xMotivo>
  <protMDFe versao="3.00">
    <infProt Id="MDFe941140000000001">
      <tpAmb>2</tpAmb>
      <chMDFe>{key}</chMDFe>
      <dhRecbto>2014-05-20T10:05:00-03:00</dhRecbto>
      <nProt>941140000000001</nProt>
      <digVal>{digest}</digVal>
      <cStat>{status}</cStat>
      <xMotivo>Autorizado o uso do MDF-e</xMotivo>
    </infProt>
  </protMDFe>
</retConsReciMDFe>"#
    )
}

fn event_response(status: u16, key: &str, event_type: &str) -> String {
    format!(
        r#"<retEventoMDFe xmlns="http://www.portalfiscal.inf.br/mdfe" versao="3.00">
  <infEvento>
    <tpAmb>2</tpAmb>
    <cStat>{status}</cStat>
    <xMotivo>Evento registrado e vinculado a MDF-e</xMotivo>
    <chMDFe>{key}</chMDFe>
    <tpEvento>{event_type}</tpEvento>
    <nSeqEvento>1</nSeqEvento>
    <nProt>941140000000077</nProt>
  </infEvento>
</retEventoMDFe>"#
    )
}

fn authorized() -> Element {
    let manifest = signed_manifest();
    let digest = digest_value(&manifest).unwrap().to_string();
    let records = parse_authorization_response(&batch_response(100, KEY, &digest)).unwrap();
    reconcile_authorization(&manifest, &records)
        .unwrap()
        .into_envelope()
}

// ── authorization ──

#[test]
fn signed_manifest_is_authorized() {
    let manifest = signed_manifest();
    verify_signature(&manifest, &signer().public_key()).unwrap();
    let digest = digest_value(&manifest).unwrap().to_string();

    let records = parse_authorization_response(&batch_response(100, KEY, &digest)).unwrap();
    let processed = reconcile_authorization(&manifest, &records).unwrap();

    assert_eq!(processed.kind(), ProcessedKind::Manifest);
    assert_eq!(processed.access_key().as_str(), KEY);
    assert_eq!(processed.protocol_number(), Some("941140000000001"));
    let xml = processed.to_xml();
    assert!(xml.starts_with("<?xml"));
    let reparsed = Element::parse(&xml).unwrap();
    assert_eq!(reparsed.name, "mdfeProc");
    assert_eq!(
        reparsed.find_text(&["protMDFe", "infProt", "cStat"]),
        Some("100")
    );
    assert_eq!(reparsed.first_child("MDFe"), Some(&manifest));
}

#[test]
fn rejected_status_is_reported() {
    let manifest = signed_manifest();
    let digest = digest_value(&manifest).unwrap().to_string();
    let records = parse_authorization_response(&batch_response(999, KEY, &digest)).unwrap();
    assert_eq!(
        reconcile_authorization(&manifest, &records).unwrap_err(),
        ReconcileError::RejectedByAuthority {
            status: 999,
            reason: "Autorizado o uso do MDF-e".into()
        }
    );
}

#[test]
fn tampered_digest_does_not_match() {
    let manifest = signed_manifest();
    let records = parse_authorization_response(&batch_response(100, KEY, "00ff")).unwrap();
    assert!(matches!(
        reconcile_authorization(&manifest, &records),
        Err(ReconcileError::DigestMismatch { .. })
    ));
}

// ── events ──

fn event(body: EventBody) -> Element {
    let request = EventRequest::new(
        mdfe_core::AccessKey::parse(KEY).unwrap(),
        Environment::Homologation,
        "81452880000139",
        body,
    )
    .with_issued_at(FiscalDateTime::parse("2014-05-21T08:00:00-03:00").unwrap());
    let unsigned = request.to_element().unwrap();
    signer().sign(&unsigned, "infEvento").unwrap()
}

fn closure() -> Element {
    event(EventBody::Closure {
        protocol: "941140000000001".into(),
        closed_on: "2014-05-21".into(),
        uf_code: "42".into(),
        municipality_code: "4205407".into(),
    })
}

fn cancellation() -> Element {
    event(EventBody::Cancellation {
        protocol: "941140000000001".into(),
        justification: "Carga nao embarcada por falha mecanica".into(),
    })
}

#[test]
fn already_closed_is_accepted_for_closure_only() {
    let response = parse_event_response(&event_response(155, KEY, "110112")).unwrap();
    let processed = reconcile_event(&closure(), &response, EventKind::Closure).unwrap();
    assert_eq!(processed.kind(), ProcessedKind::Event);
    assert_eq!(processed.envelope().name, "procEventoMDFe");

    let response = parse_event_response(&event_response(155, KEY, "110111")).unwrap();
    assert!(matches!(
        reconcile_event(&cancellation(), &response, EventKind::Cancellation),
        Err(ReconcileError::RejectedByAuthority { status: 155, .. })
    ));
}

#[test]
fn cancellation_cannot_pass_as_closure() {
    let response = parse_event_response(&event_response(155, KEY, "110111")).unwrap();
    assert_eq!(
        reconcile_event(&cancellation(), &response, EventKind::Closure).unwrap_err(),
        ReconcileError::WrongEventKind {
            expected: 110112,
            found: "110111".into()
        }
    );
}

#[test]
fn event_for_another_document_is_a_subject_mismatch() {
    let other = "41140581452880000139580010000000291611743163";
    let response = parse_event_response(&event_response(135, other, "110111")).unwrap();
    assert_eq!(
        reconcile_event(&cancellation(), &response, EventKind::Cancellation).unwrap_err(),
        ReconcileError::SubjectMismatch {
            expected: KEY.into(),
            found: other.into()
        }
    );
}

// ── cancellation ──

#[test]
fn cancellation_marks_authorized_manifest() {
    let processed = authorized();
    let response = parse_event_response(&event_response(135, KEY, "110111")).unwrap();
    reconcile_event(&cancellation(), &response, EventKind::Cancellation).unwrap();

    let cancelled = cancel_register(&processed, &response).unwrap();
    let info = cancelled.find(&["protMDFe", "infProt"]).unwrap();
    assert_eq!(info.find_text(&["cStat"]), Some("101"));
    assert_eq!(info.find_text(&["nProt"]), Some("941140000000077"));
    assert_eq!(
        info.find_text(&["xMotivo"]),
        Some("Cancelamento de MDF-e homologado")
    );
    assert_eq!(cancelled.first_child("MDFe"), processed.first_child("MDFe"));
}

#[test]
fn cancellation_rejected_by_authority_leaves_document_alone() {
    let processed = authorized();
    let response = parse_event_response(&event_response(573, KEY, "110111")).unwrap();
    assert!(matches!(
        cancel_register(&processed, &response),
        Err(ReconcileError::RejectedByAuthority { status: 573, .. })
    ));
    assert_eq!(
        processed.find_text(&["protMDFe", "infProt", "cStat"]),
        Some("100")
    );
}
