//! # Build and Adjust Subcommands
//!
//! `mdfe build` assembles a manifest from a YAML or JSON description.
//! The description mirrors the builder's tag operations: each section is
//! deserialized straight into the builder's input record and applied in
//! document order. Every problem in the description is reported at once.
//!
//! ```yaml
//! ide:
//!   uf_code: "41"
//!   environment: "2"
//!   issuer_type: "2"
//!   series: "1"
//!   number: "28"
//!   control_number: "61174316"
//!   modal: "1"
//!   process: "0"
//!   process_version: "mdfe-cli"
//!   uf_start: PR
//!   uf_end: SC
//! emit:
//!   tax_id: { cnpj: "81452880000139" }
//!   state_registration: "9012345678"
//!   name: TRANSPORTADORA TESTE
//! modal:
//!   road:
//!     vehicle: { plate: ABC1234, tare: "5000", wheel_type: "03", body_type: "02" }
//!     drivers: [{ name: JOAO DA SILVA, cpf: "12345678901" }]
//! totals: { cargo_value: "1000.00", weight_unit: "01", gross_weight: "500.0000" }
//! ```
//!
//! `ide/tpEmis` comes from the persisted contingency config, never from
//! the description. `mdfe adjust` re-keys an existing document under it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use mdfe_document::{
    adjust, AdditionalInfoInput, AddressInput, AirInput, AnttInput, CargoUnitInput, CiotInput,
    ContractorInput, ConvoyInput, DominantProductInput, DriverInput, EmitInput, EmptyUnitInput,
    FullLoadInput, HazardousInput, IdeInput, InfMdfeInput, InsuranceInput, LinkedDocumentInput,
    LoadingMunicipalityInput, ManifestBuilder, ManifestDocument, OwnerInput, PartyId,
    PaymentInput, RailInput, RoadInput, RouteInput, TechnicalResponsibleInput, TerminalInput,
    TollDeviceInput, TotalsInput, TrailerInput, TransportUnitInput, UnloadingMunicipalityInput,
    VehicleInput, WagonInput, WaterInput,
};
use mdfe_state::ContingencyHandle;

use crate::config::EmitterConfig;

// ─── Description ─────────────────────────────────────────────────────

/// A complete manifest description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestSpec {
    /// `infMDFe` attributes.
    pub inf_mdfe: Option<InfMdfeInput>,
    /// `ide`
    pub ide: IdeInput,
    /// `ide/infMunCarrega`
    pub loading_municipalities: Vec<LoadingMunicipalityInput>,
    /// `ide/infPercurso`
    pub route: Vec<RouteInput>,
    /// `emit`
    pub emit: EmitInput,
    /// `emit/enderEmit`
    pub address: Option<AddressInput>,
    /// `infModal` content.
    pub modal: ModalSpec,
    /// `infDoc/infMunDescarga`
    pub unloading_municipalities: Vec<UnloadingMunicipalityInput>,
    /// `infCTe`
    pub cte: Vec<LinkedDocumentInput>,
    /// `infNFe`
    pub nfe: Vec<LinkedDocumentInput>,
    /// `infMDFeTransp`
    pub mdfe: Vec<LinkedDocumentInput>,
    /// `infUnidTransp`
    pub transport_units: Vec<TransportUnitInput>,
    /// `infUnidCarga`
    pub cargo_units: Vec<CargoUnitInput>,
    /// `peri`
    pub hazardous: Vec<HazardousInput>,
    /// `seg`
    pub insurance: Vec<InsuranceInput>,
    /// `prodPred`
    pub dominant_product: Option<DominantProductInput>,
    /// `prodPred/infLotacao`
    pub full_load: Option<FullLoadInput>,
    /// `tot`
    pub totals: TotalsInput,
    /// `lacres`
    pub seals: Vec<String>,
    /// `autXML`
    pub authorized_parties: Vec<PartyId>,
    /// `infAdic`
    pub additional: Option<AdditionalInfoInput>,
    /// `infRespTec`
    pub technical_responsible: Option<TechnicalResponsibleInput>,
}

/// Modal sections. Exactly one should be present; a second one is
/// reported by the builder as a conflicting modal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModalSpec {
    /// `rodo`
    pub road: Option<RoadSpec>,
    /// `aereo`
    pub air: Option<AirInput>,
    /// `aquav`
    pub water: Option<WaterSpec>,
    /// `ferrov`
    pub rail: Option<RailSpec>,
}

/// Road modal with its nested groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadSpec {
    /// `rodo` leaves.
    #[serde(flatten)]
    pub road: RoadInput,
    /// `infANTT`
    pub antt: Option<AnttSpec>,
    /// `veicTracao`
    pub vehicle: VehicleInput,
    /// `veicTracao/prop`
    pub vehicle_owner: Option<OwnerInput>,
    /// `veicTracao/condutor`
    pub drivers: Vec<DriverInput>,
    /// `veicReboque`, in order.
    pub trailers: Vec<TrailerInput>,
    /// `veicReboque/prop`, matched to trailers by `item`.
    pub trailer_owners: Vec<OwnerInput>,
    /// `lacRodo`
    pub seals: Vec<String>,
}

/// `infANTT` and its lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnttSpec {
    #[serde(flatten)]
    pub antt: AnttInput,
    pub ciot: Vec<CiotInput>,
    pub toll_devices: Vec<TollDeviceInput>,
    pub contractors: Vec<ContractorInput>,
    pub payments: Vec<PaymentInput>,
}

/// Waterway modal with terminals, convoy and empty units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterSpec {
    #[serde(flatten)]
    pub vessel: WaterInput,
    pub loading_terminals: Vec<TerminalInput>,
    pub unloading_terminals: Vec<TerminalInput>,
    pub convoy: Vec<ConvoyInput>,
    pub empty_cargo_units: Vec<EmptyUnitInput>,
    pub empty_transport_units: Vec<EmptyUnitInput>,
}

/// Rail modal: `trem` plus its wagons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RailSpec {
    #[serde(flatten)]
    pub train: RailInput,
    pub wagons: Vec<WagonInput>,
}

impl ManifestSpec {
    /// Read a description; `.json` files are JSON, anything else YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        let spec = if is_json {
            serde_json::from_str(&content).map_err(anyhow::Error::from)
        } else {
            serde_yaml::from_str(&content).map_err(anyhow::Error::from)
        };
        spec.with_context(|| format!("failed to parse manifest description {}", path.display()))
    }

    /// Run every tag operation the description calls for.
    pub fn apply(&self, b: &mut ManifestBuilder) {
        if let Some(inf) = &self.inf_mdfe {
            b.tag_inf_mdfe(inf);
        }
        b.tag_ide(&self.ide);
        for m in &self.loading_municipalities {
            b.tag_inf_mun_carrega(m);
        }
        for r in &self.route {
            b.tag_inf_percurso(r);
        }
        b.tag_emit(&self.emit);
        if let Some(address) = &self.address {
            b.tag_ender_emit(address);
        }
        self.modal.apply(b);

        for m in &self.unloading_municipalities {
            b.tag_inf_mun_descarga(m);
        }
        for d in &self.cte {
            b.tag_inf_cte(d);
        }
        for d in &self.nfe {
            b.tag_inf_nfe(d);
        }
        for d in &self.mdfe {
            b.tag_inf_mdfe_transp(d);
        }
        for u in &self.transport_units {
            b.tag_inf_unid_transp(u);
        }
        for u in &self.cargo_units {
            b.tag_inf_unid_carga(u);
        }
        for h in &self.hazardous {
            b.tag_peri(h);
        }

        for s in &self.insurance {
            b.tag_seg(s);
        }
        if let Some(p) = &self.dominant_product {
            b.tag_prod_pred(p);
        }
        if let Some(l) = &self.full_load {
            b.tag_inf_lotacao(l);
        }
        b.tag_tot(&self.totals);
        for s in &self.seals {
            b.tag_lacres(s);
        }
        for p in &self.authorized_parties {
            b.tag_aut_xml(p);
        }
        if let Some(a) = &self.additional {
            b.tag_inf_adic(a);
        }
        if let Some(t) = &self.technical_responsible {
            b.tag_inf_resp_tec(t);
        }
    }

    /// Build the finished document under `contingency`.
    pub fn build(&self, contingency: &ContingencyHandle) -> Result<ManifestDocument> {
        let mut b = ManifestBuilder::new(contingency);
        self.apply(&mut b);
        Ok(b.build()?)
    }
}

impl ModalSpec {
    fn apply(&self, b: &mut ManifestBuilder) {
        if let Some(road) = &self.road {
            road.apply(b);
        }
        if let Some(air) = &self.air {
            b.tag_aereo(air);
        }
        if let Some(water) = &self.water {
            b.tag_aquav(&water.vessel);
            for t in &water.loading_terminals {
                b.tag_inf_term_carreg(t);
            }
            for t in &water.unloading_terminals {
                b.tag_inf_term_descarreg(t);
            }
            for c in &water.convoy {
                b.tag_inf_emb_comb(c);
            }
            for u in &water.empty_cargo_units {
                b.tag_inf_unid_carga_vazia(u);
            }
            for u in &water.empty_transport_units {
                b.tag_inf_unid_transp_vazia(u);
            }
        }
        if let Some(rail) = &self.rail {
            b.tag_ferrov(&rail.train);
            for w in &rail.wagons {
                b.tag_vag(w);
            }
        }
    }
}

impl RoadSpec {
    fn apply(&self, b: &mut ManifestBuilder) {
        b.tag_rodo(&self.road);
        if let Some(antt) = &self.antt {
            b.tag_inf_antt(&antt.antt);
            for c in &antt.ciot {
                b.tag_inf_ciot(c);
            }
            if !antt.toll_devices.is_empty() {
                b.tag_vale_ped(&antt.toll_devices);
            }
            for c in &antt.contractors {
                b.tag_inf_contratante(c);
            }
            for p in &antt.payments {
                b.tag_inf_pag(p);
            }
        }
        b.tag_veic_tracao(&self.vehicle);
        if let Some(owner) = &self.vehicle_owner {
            b.tag_veic_tracao_prop(owner);
        }
        for d in &self.drivers {
            b.tag_condutor(d);
        }
        for t in &self.trailers {
            b.tag_veic_reboque(t);
        }
        for o in &self.trailer_owners {
            b.tag_veic_reboque_prop(o);
        }
        for s in &self.seals {
            b.tag_lac_rodo(s);
        }
    }
}

// ─── Commands ────────────────────────────────────────────────────────

/// Arguments for `mdfe build`.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// YAML or JSON manifest description.
    pub spec: PathBuf,
    /// Write the document here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Arguments for `mdfe adjust`.
#[derive(Args, Debug)]
pub struct AdjustArgs {
    /// Finished manifest XML.
    pub document: PathBuf,
    /// Write the adjusted document here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub(crate) fn emit_output(xml: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, xml)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{xml}");
            Ok(())
        }
    }
}

/// Execute `mdfe build`.
pub fn run_build(args: &BuildArgs, config: &EmitterConfig) -> Result<u8> {
    let spec = ManifestSpec::load(&args.spec)?;
    let handle = config.contingency_handle()?;
    let document = spec.build(&handle)?;
    tracing::info!(
        key = %document.access_key(),
        emission_type = %document.emission_type(),
        "manifest built"
    );
    emit_output(&document.to_xml(), args.out.as_deref())?;
    Ok(0)
}

/// Execute `mdfe adjust`.
pub fn run_adjust(args: &AdjustArgs, config: &EmitterConfig) -> Result<u8> {
    let xml = std::fs::read_to_string(&args.document)
        .with_context(|| format!("failed to read {}", args.document.display()))?;
    let document = ManifestDocument::parse(&xml).context("not a finished manifest")?;
    let contingency = config.load_contingency()?;
    let adjusted = adjust(&document, &contingency).context("cannot adjust manifest")?;
    if adjusted.access_key() != document.access_key() {
        tracing::info!(previous = %document.access_key(), key = %adjusted.access_key(), "document re-keyed");
    }
    emit_output(&adjusted.to_xml(), args.out.as_deref())?;
    Ok(0)
}
