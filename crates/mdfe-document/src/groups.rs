//! # Group Input Records
//!
//! One structured record per tag operation. Required layout fields are
//! plain `String`s (blank counts as missing and is reported at build
//! time); optional fields are `Option`s and are omitted when `None` or
//! blank. Every record deserializes with defaults so a partially filled
//! YAML or JSON description still loads and reports all of its gaps at
//! once.
//!
//! The element each field becomes is named in its doc comment.

use serde::{Deserialize, Serialize};

/// Tax identity of a party: exactly one of CNPJ, CPF or a foreign id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyId {
    /// Company registry number (`CNPJ`).
    Cnpj(String),
    /// Individual taxpayer number (`CPF`).
    Cpf(String),
    /// Foreign identifier (`idEstrangeiro`).
    Foreign(String),
}

impl PartyId {
    /// Element name the identity is written under.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Cnpj(_) => "CNPJ",
            Self::Cpf(_) => "CPF",
            Self::Foreign(_) => "idEstrangeiro",
        }
    }

    /// The identifier itself.
    pub fn value(&self) -> &str {
        match self {
            Self::Cnpj(v) | Self::Cpf(v) | Self::Foreign(v) => v,
        }
    }
}

// ─── Header ──────────────────────────────────────────────────────────

/// `infMDFe` attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfMdfeInput {
    /// `versao`; defaults to the current layout version.
    pub version: Option<String>,
    /// Declared `Id` (`MDFe` + key). Corrected at build if stale.
    pub id: Option<String>,
}

/// `ide`: identification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdeInput {
    /// `cUF`
    pub uf_code: String,
    /// `tpAmb`
    pub environment: String,
    /// `tpEmit`: 1 carrier, 2 own-cargo issuer, 3 carrier of own CT-e.
    pub issuer_type: String,
    /// `tpTransp`
    pub carrier_type: Option<String>,
    /// `mod`; defaults to `58`.
    pub model: Option<String>,
    /// `serie`
    pub series: String,
    /// `nMDF`
    pub number: String,
    /// `cMDF`
    pub control_number: String,
    /// `cDV`; recomputed at build.
    pub check_digit: Option<String>,
    /// `modal`: 1 road, 2 air, 3 water, 4 rail.
    pub modal: String,
    /// `dhEmi`; defaults to now.
    pub issued_at: Option<String>,
    /// `tpEmis`; overwritten from the contingency state at build.
    pub emission_type: Option<String>,
    /// `procEmi`
    pub process: String,
    /// `verProc`
    pub process_version: String,
    /// `UFIni`
    pub uf_start: String,
    /// `UFFim`
    pub uf_end: String,
    /// `dhIniViagem`
    pub trip_start: Option<String>,
    /// `indCanalVerde`
    pub green_channel: Option<String>,
    /// `indCarregaPosterior`
    pub late_loading: Option<String>,
}

/// `infMunCarrega`: a loading municipality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingMunicipalityInput {
    /// `cMunCarrega`
    pub code: String,
    /// `xMunCarrega`
    pub name: String,
}

/// `infPercurso`: a federation unit crossed on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteInput {
    /// `UFPer`
    pub uf: String,
}

/// `emit`: issuer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitInput {
    /// `CNPJ` or `CPF`.
    pub tax_id: Option<PartyId>,
    /// `IE`
    pub state_registration: String,
    /// `xNome`
    pub name: String,
    /// `xFant`
    pub trade_name: Option<String>,
}

/// `enderEmit`: issuer address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressInput {
    /// `xLgr`
    pub street: String,
    /// `nro`
    pub number: String,
    /// `xCpl`
    pub complement: Option<String>,
    /// `xBairro`
    pub district: String,
    /// `cMun`
    pub municipality_code: String,
    /// `xMun`
    pub municipality: String,
    /// `CEP`
    pub postal_code: Option<String>,
    /// `UF`
    pub uf: String,
    /// `fone`
    pub phone: Option<String>,
    /// `email`
    pub email: Option<String>,
}

// ─── Road ────────────────────────────────────────────────────────────

/// `rodo`: opens the road modal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadInput {
    /// `codAgPorto`
    pub port_agency_code: Option<String>,
}

/// `infANTT`: national land-transport registry data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnttInput {
    /// `RNTRC`
    pub rntrc: Option<String>,
}

/// `infCIOT`: freight operation code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CiotInput {
    /// `CIOT`
    pub ciot: String,
    /// `CPF` or `CNPJ` of the responsible party.
    pub party: Option<PartyId>,
}

/// `valePed/disp`: a toll-voucher device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TollDeviceInput {
    /// `CNPJForn`
    pub supplier_cnpj: String,
    /// `CNPJPg` or `CPFPg`.
    pub payer: Option<PartyId>,
    /// `nCompra`
    pub purchase_number: Option<String>,
    /// `vValePed`
    pub amount: String,
    /// `tpValePed`
    pub kind: Option<String>,
}

/// `infContratante`: contracting party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractorInput {
    /// `xNome`
    pub name: Option<String>,
    /// `CPF`, `CNPJ` or `idEstrangeiro`.
    pub party: Option<PartyId>,
}

/// `infPag/Comp`: a freight component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentComponentInput {
    /// `tpComp`
    pub kind: String,
    /// `vComp`
    pub value: String,
    /// `xComp`
    pub description: Option<String>,
}

/// `infPag/infPrazo`: an installment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallmentInput {
    /// `nParcela`
    pub number: String,
    /// `dVenc`
    pub due_date: String,
    /// `vParcela`
    pub value: String,
}

/// `infPag/infBanc`: bank or payment-institution details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankInput {
    /// `codBanco`
    pub bank_code: Option<String>,
    /// `codAgencia`
    pub agency_code: Option<String>,
    /// `CNPJIPEF`
    pub ipef_cnpj: Option<String>,
}

/// `infPag`: freight payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentInput {
    /// `xNome`
    pub name: Option<String>,
    /// `CPF`, `CNPJ` or `idEstrangeiro`.
    pub party: Option<PartyId>,
    /// `Comp`
    pub components: Vec<PaymentComponentInput>,
    /// `vContrato`
    pub contract_value: String,
    /// `indAltoDesemp`
    pub high_performance: Option<String>,
    /// `indPag`: 0 upfront, 1 in installments.
    pub payment_indicator: String,
    /// `vAdiant`
    pub advance: Option<String>,
    /// `infPrazo`; written only when paying in installments.
    pub installments: Vec<InstallmentInput>,
    /// `infBanc`
    pub bank: BankInput,
}

/// `veicTracao`: traction vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleInput {
    /// `cInt`
    pub internal_code: Option<String>,
    /// `placa`
    pub plate: String,
    /// `RENAVAM`
    pub renavam: Option<String>,
    /// `tara`
    pub tare: String,
    /// `capKG`
    pub capacity_kg: Option<String>,
    /// `capM3`
    pub capacity_m3: Option<String>,
    /// `tpRod`
    pub wheel_type: String,
    /// `tpCar`
    pub body_type: String,
    /// `UF`
    pub uf: Option<String>,
}

/// `veicReboque`: a trailer, keyed by `item`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailerInput {
    /// Index owners join on.
    pub item: u32,
    /// `cInt`
    pub internal_code: Option<String>,
    /// `placa`
    pub plate: String,
    /// `RENAVAM`
    pub renavam: Option<String>,
    /// `tara`
    pub tare: String,
    /// `capKG`
    pub capacity_kg: String,
    /// `capM3`
    pub capacity_m3: Option<String>,
    /// `tpCar`
    pub body_type: String,
    /// `UF`
    pub uf: Option<String>,
}

/// `prop`: owner of a vehicle that is not the issuer's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnerInput {
    /// Trailer index, for trailer owners.
    pub item: u32,
    /// `CPF` or `CNPJ`.
    pub party: Option<PartyId>,
    /// `RNTRC`
    pub rntrc: String,
    /// `xNome`
    pub name: String,
    /// `IE`
    pub state_registration: Option<String>,
    /// `UF`
    pub uf: Option<String>,
    /// `tpProp`
    pub owner_type: String,
}

/// `condutor`: a driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverInput {
    /// `xNome`
    pub name: String,
    /// `CPF`
    pub cpf: String,
}

// ─── Air / Water / Rail ──────────────────────────────────────────────

/// `aereo`: air modal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirInput {
    /// `nac`
    pub nationality: String,
    /// `matr`
    pub registration: String,
    /// `nVoo`
    pub flight: String,
    /// `cAerEmb`
    pub departure_airport: String,
    /// `cAerDes`
    pub destination_airport: String,
    /// `dVoo`
    pub flight_date: String,
}

/// `aquav`: water modal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterInput {
    /// `irin`
    pub irin: String,
    /// `tpEmb`
    pub vessel_type: String,
    /// `cEmbar`
    pub vessel_code: String,
    /// `xEmbar`
    pub vessel_name: String,
    /// `nViag`
    pub voyage: String,
    /// `cPrtEmb`
    pub port_of_loading: String,
    /// `cPrtDest`
    pub port_of_destination: String,
    /// `prtTrans`
    pub transshipment_port: Option<String>,
    /// `tpNav`
    pub navigation_type: Option<String>,
}

/// `infTermCarreg` / `infTermDescarreg`: a port terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalInput {
    /// Terminal code.
    pub code: String,
    /// Terminal name.
    pub name: String,
}

/// `infEmbComb`: a convoy vessel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvoyInput {
    /// `cEmbComb`
    pub vessel_code: String,
    /// `xBalsa`
    pub barge: String,
}

/// `infUnidCargaVazia` / `infUnidTranspVazia`: an empty unit on board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmptyUnitInput {
    /// Unit identifier.
    pub id: String,
    /// Unit type code.
    pub kind: String,
}

/// `ferrov/trem`: rail modal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RailInput {
    /// `xPref`
    pub prefix: String,
    /// `dhTrem`
    pub departed_at: Option<String>,
    /// `xOri`
    pub origin: String,
    /// `xDest`
    pub destination: String,
    /// `qVag`
    pub wagon_count: String,
}

/// `vag`: a wagon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WagonInput {
    /// `pesoBC`
    pub base_weight: String,
    /// `pesoR`
    pub actual_weight: String,
    /// `tpVag`
    pub kind: Option<String>,
    /// `serie`
    pub series: String,
    /// `nVag`
    pub number: String,
    /// `nSeq`
    pub sequence: Option<String>,
    /// `TU`
    pub useful_tonnage: String,
}

// ─── Linked Documents ────────────────────────────────────────────────

/// `infMunDescarga`: an unloading municipality, keyed by `item`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnloadingMunicipalityInput {
    /// Index linked documents attach to.
    pub item: u32,
    /// `cMunDescarga`
    pub code: String,
    /// `xMunDescarga`
    pub name: String,
}

/// `infCTe` / `infNFe` / `infMDFeTransp`: a transported document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkedDocumentInput {
    /// Index of the unloading municipality this document belongs to.
    pub item: u32,
    /// `chCTe` / `chNFe` / `chMDFe`
    pub key: String,
    /// `SegCodBarra`
    pub barcode_segment: Option<String>,
    /// `indReentrega`
    pub redelivery: Option<String>,
    /// Index of the transport units and hazardous products carried.
    pub transport_unit_item: Option<u32>,
}

/// `infUnidTransp`: a transport unit, keyed by `item`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportUnitInput {
    /// Index documents and cargo units refer to.
    pub item: u32,
    /// `tpUnidTransp`
    pub kind: String,
    /// `idUnidTransp`
    pub id: String,
    /// `lacUnidTransp/nLacre`
    pub seals: Vec<String>,
    /// `qtdRat`
    pub apportioned_quantity: Option<String>,
}

/// `infUnidCarga`: a cargo unit inside the transport unit with the same `item`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CargoUnitInput {
    /// Index of the enclosing transport unit.
    pub item: u32,
    /// `tpUnidCarga`
    pub kind: String,
    /// `idUnidCarga`
    pub id: String,
    /// `lacUnidCarga/nLacre`
    pub seals: Vec<String>,
    /// `qtdRat`
    pub apportioned_quantity: Option<String>,
}

/// `peri`: hazardous product carried by the document whose
/// `transport_unit_item` equals `item`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardousInput {
    /// Join index.
    pub item: u32,
    /// `nONU`
    pub un_number: String,
    /// `xNomeAE`
    pub shipping_name: Option<String>,
    /// `xClaRisco`
    pub risk_class: Option<String>,
    /// `grEmb`
    pub packing_group: Option<String>,
    /// `qTotProd`
    pub total_quantity: String,
    /// `qVolTipo`
    pub volume_type: Option<String>,
}

// ─── Trailing Groups ─────────────────────────────────────────────────

/// `seg`: cargo insurance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsuranceInput {
    /// `infResp/respSeg`: 1 issuer, 2 contractor.
    pub responsible: String,
    /// `infResp/CNPJ|CPF`
    pub responsible_party: Option<PartyId>,
    /// `infSeg/xSeg`
    pub insurer_name: Option<String>,
    /// `infSeg/CNPJ`
    pub insurer_cnpj: Option<String>,
    /// `nApol`
    pub policy_number: Option<String>,
    /// `nAver`
    pub endorsements: Vec<String>,
}

/// `prodPred`: dominant product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DominantProductInput {
    /// `tpCarga`
    pub cargo_type: String,
    /// `xProd`
    pub description: String,
    /// `cEAN`
    pub ean: Option<String>,
    /// `NCM`
    pub ncm: Option<String>,
}

/// `infLocalCarrega` / `infLocalDescarrega`: by postal code or coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationInput {
    /// `CEP`
    pub postal_code: Option<String>,
    /// `latitude`
    pub latitude: Option<String>,
    /// `longitude`
    pub longitude: Option<String>,
}

/// `infLotacao`: full-load origin and destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FullLoadInput {
    /// `infLocalCarrega`
    pub loading: LocationInput,
    /// `infLocalDescarrega`
    pub unloading: LocationInput,
}

/// `tot`: totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TotalsInput {
    /// `qCTe`
    pub cte_count: Option<String>,
    /// `qNFe`
    pub nfe_count: Option<String>,
    /// `qMDFe`
    pub mdfe_count: Option<String>,
    /// `vCarga`
    pub cargo_value: String,
    /// `cUnid`: 01 kg, 02 ton.
    pub weight_unit: String,
    /// `qCarga`
    pub gross_weight: String,
}

/// `infAdic`: free-text notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditionalInfoInput {
    /// `infAdFisco`
    pub fiscal: Option<String>,
    /// `infCpl`
    pub taxpayer: Option<String>,
}

/// `infRespTec`: technical responsible for the issuing software.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalResponsibleInput {
    /// `CNPJ`
    pub cnpj: String,
    /// `xContato`
    pub contact: String,
    /// `email`
    pub email: String,
    /// `fone`
    pub phone: String,
}
