//! # Manifest Builder
//!
//! Incremental assembly of an `MDFe` tree. Each `tag_*` operation adds one
//! layout group at the position its schema slot dictates, whatever order
//! the caller uses. Problems are collected rather than raised and come
//! back together from [`ManifestBuilder::build`].
//!
//! ## Deferred joins
//!
//! Groups keyed by an item index (trailers and their owners, unloading
//! municipalities and the documents, transport units, cargo units and
//! hazardous products under them) are only joined at build time. A
//! template that several parents reference is deep-cloned into each.
//!
//! Groups whose single parent does not exist yet (a driver registered
//! before its traction vehicle) wait in a pending list and are flushed at
//! build time; a parent that never appears is a
//! [`BuildError::MissingParent`].
//!
//! ## Emission type
//!
//! `ide/tpEmis` always comes from the [`ContingencyHandle`] snapshot taken
//! at build time, never from the caller's input.

use mdfe_core::{FiscalDateTime, DEFAULT_MODEL, DEFAULT_VERSION};
use mdfe_state::ContingencyHandle;

use crate::arena::{Arena, NodeId};
use crate::document::ManifestDocument;
use crate::error::{BuildError, BuildErrors};
use crate::finalize;
use crate::groups::{
    AdditionalInfoInput, AddressInput, DominantProductInput, EmitInput, FullLoadInput, IdeInput,
    InfMdfeInput, InsuranceInput, LoadingMunicipalityInput, LocationInput, PartyId, RouteInput,
    TechnicalResponsibleInput, TotalsInput,
};
use crate::keyed::Keyed;
use crate::linked::LinkedDocument;
use crate::modal::{ModalBranch, ModalKind};

/// Groups whose single parent may be registered after them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Parent {
    Ide,
    Emit,
    ProdPred,
    Rodo,
    InfAntt,
    VeicTracao,
    Aquav,
    Ferrov,
}

impl Parent {
    fn tag(self) -> &'static str {
        match self {
            Self::Ide => "ide",
            Self::Emit => "emit",
            Self::ProdPred => "prodPred",
            Self::Rodo => "rodo",
            Self::InfAntt => "infANTT",
            Self::VeicTracao => "veicTracao",
            Self::Aquav => "aquav",
            Self::Ferrov => "ferrov",
        }
    }
}

/// Assembles one manifest. Not shared between threads; the contingency
/// handle it holds is.
#[derive(Debug)]
pub struct ManifestBuilder {
    pub(crate) arena: Arena,
    pub(crate) errors: Vec<BuildError>,
    contingency: ContingencyHandle,
    root: NodeId,
    pub(crate) inf: NodeId,
    ide: Option<NodeId>,
    emit: Option<NodeId>,
    tot: Option<NodeId>,
    pub(crate) prod_pred: Option<NodeId>,
    issuer_type: Option<String>,
    declared_modal: Option<String>,
    pub(crate) modal: Option<ModalBranch>,
    pub(crate) inf_antt: Option<NodeId>,
    pub(crate) veic_tracao: Option<NodeId>,
    pub(crate) trailers: Keyed,
    pub(crate) trailer_owners: Keyed,
    pub(crate) municipalities: Keyed,
    pub(crate) documents: Vec<LinkedDocument>,
    pub(crate) transport_units: Keyed,
    pub(crate) cargo_units: Keyed,
    pub(crate) hazardous: Keyed,
    pending: Vec<(Parent, NodeId)>,
    full_load: bool,
}

impl ManifestBuilder {
    /// Start an empty manifest at the default layout version.
    pub fn new(contingency: &ContingencyHandle) -> Self {
        let mut arena = Arena::new();
        let root = arena.create("MDFe");
        arena.set_attribute(root, "xmlns", mdfe_core::MDFE_NAMESPACE);
        let inf = arena.create("infMDFe");
        arena.set_attribute(inf, "Id", "");
        arena.set_attribute(inf, "versao", DEFAULT_VERSION);
        let mut builder = Self {
            arena,
            errors: Vec::new(),
            contingency: contingency.clone(),
            root,
            inf,
            ide: None,
            emit: None,
            tot: None,
            prod_pred: None,
            issuer_type: None,
            declared_modal: None,
            modal: None,
            inf_antt: None,
            veic_tracao: None,
            trailers: Keyed::default(),
            trailer_owners: Keyed::default(),
            municipalities: Keyed::default(),
            documents: Vec::new(),
            transport_units: Keyed::default(),
            cargo_units: Keyed::default(),
            hazardous: Keyed::default(),
            pending: Vec::new(),
            full_load: false,
        };
        builder.place(root, inf);
        builder
    }

    /// Problems collected so far.
    pub fn errors(&self) -> &[BuildError] {
        &self.errors
    }

    // ─── Placement helpers ───────────────────────────────────────────

    pub(crate) fn place(&mut self, parent: NodeId, child: NodeId) {
        if let Err(e) = self.arena.insert_at_slot(parent, child) {
            self.errors.push(e);
        }
    }

    /// Add a required leaf; blank values are reported.
    pub(crate) fn required(&mut self, parent: NodeId, field: &'static str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.errors.push(BuildError::MissingRequiredField {
                field,
                group: self.arena.name(parent),
            });
            return;
        }
        let leaf = self.arena.create_leaf(field, value);
        self.place(parent, leaf);
    }

    /// Add a leaf only when a non-blank value is given.
    pub(crate) fn optional(&mut self, parent: NodeId, field: &'static str, value: Option<&str>) {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            let leaf = self.arena.create_leaf(field, value);
            self.place(parent, leaf);
        }
    }

    /// Add the party identity leaf (`CNPJ`, `CPF` or `idEstrangeiro`).
    pub(crate) fn party(&mut self, parent: NodeId, party: Option<&PartyId>) {
        match party {
            Some(p) => self.required(parent, p.tag(), p.value()),
            None => self.errors.push(BuildError::MissingRequiredField {
                field: "CNPJ",
                group: self.arena.name(parent),
            }),
        }
    }

    pub(crate) fn seal(&mut self, parent: NodeId, group: &'static str, number: &str) -> NodeId {
        let node = self.arena.create(group);
        self.required(node, "nLacre", number);
        self.place(parent, node);
        node
    }

    pub(crate) fn note_duplicate(&mut self, existing: Option<NodeId>, group: &str) {
        if existing.is_some() {
            self.errors
                .push(BuildError::Validation(format!("{group} registered more than once")));
        }
    }

    fn resolve(&self, parent: Parent) -> Option<NodeId> {
        let modal_node = |kind: ModalKind| {
            self.modal
                .filter(|branch| branch.kind() == kind)
                .map(ModalBranch::node)
        };
        match parent {
            Parent::Ide => self.ide,
            Parent::Emit => self.emit,
            Parent::ProdPred => self.prod_pred,
            Parent::InfAntt => self.inf_antt,
            Parent::VeicTracao => self.veic_tracao,
            Parent::Rodo => modal_node(ModalKind::Road),
            Parent::Aquav => modal_node(ModalKind::Water),
            Parent::Ferrov => modal_node(ModalKind::Rail),
        }
    }

    /// Place `node` under `parent` now, or once the parent exists.
    pub(crate) fn attach(&mut self, parent: Parent, node: NodeId) {
        match self.resolve(parent) {
            Some(p) => self.place(p, node),
            None => self.pending.push((parent, node)),
        }
    }

    // ─── Header ──────────────────────────────────────────────────────

    /// `infMDFe` attributes. A declared `Id` is only a hint; the key is
    /// re-derived at build time.
    pub fn tag_inf_mdfe(&mut self, input: &InfMdfeInput) -> NodeId {
        if let Some(version) = input.version.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            self.arena.set_attribute(self.inf, "versao", version);
        }
        if let Some(id) = input.id.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            let id = if id.starts_with("MDFe") {
                id.to_string()
            } else {
                format!("MDFe{id}")
            };
            self.arena.set_attribute(self.inf, "Id", id);
        }
        self.inf
    }

    /// `ide`: identification.
    pub fn tag_ide(&mut self, input: &IdeInput) -> NodeId {
        self.note_duplicate(self.ide, "ide");
        let ide = self.arena.create("ide");
        self.required(ide, "cUF", &input.uf_code);
        self.required(ide, "tpAmb", &input.environment);
        self.required(ide, "tpEmit", &input.issuer_type);
        self.optional(ide, "tpTransp", input.carrier_type.as_deref());
        self.required(ide, "mod", input.model.as_deref().unwrap_or(DEFAULT_MODEL));
        self.required(ide, "serie", &input.series);
        self.required(ide, "nMDF", &input.number);
        self.required(ide, "cMDF", &input.control_number);
        self.required(ide, "cDV", input.check_digit.as_deref().unwrap_or("0"));
        self.required(ide, "modal", &input.modal);
        let issued_at = match input.issued_at.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw.to_string(),
            _ => FiscalDateTime::now().to_rfc3339(),
        };
        self.required(ide, "dhEmi", &issued_at);
        self.required(ide, "tpEmis", input.emission_type.as_deref().unwrap_or("1"));
        self.required(ide, "procEmi", &input.process);
        self.required(ide, "verProc", &input.process_version);
        self.required(ide, "UFIni", &input.uf_start);
        self.required(ide, "UFFim", &input.uf_end);
        self.optional(ide, "dhIniViagem", input.trip_start.as_deref());
        self.optional(ide, "indCanalVerde", input.green_channel.as_deref());
        self.optional(ide, "indCarregaPosterior", input.late_loading.as_deref());

        self.issuer_type = Some(input.issuer_type.trim().to_string());
        self.declared_modal = Some(input.modal.trim().to_string());
        self.ide = Some(ide);
        self.place(self.inf, ide);
        ide
    }

    /// `ide/infMunCarrega`: a loading municipality.
    pub fn tag_inf_mun_carrega(&mut self, input: &LoadingMunicipalityInput) -> NodeId {
        let node = self.arena.create("infMunCarrega");
        self.required(node, "cMunCarrega", &input.code);
        self.required(node, "xMunCarrega", &input.name);
        self.attach(Parent::Ide, node);
        node
    }

    /// `ide/infPercurso`: a state crossed on the route.
    pub fn tag_inf_percurso(&mut self, input: &RouteInput) -> NodeId {
        let node = self.arena.create("infPercurso");
        self.required(node, "UFPer", &input.uf);
        self.attach(Parent::Ide, node);
        node
    }

    /// `emit`: issuer.
    pub fn tag_emit(&mut self, input: &EmitInput) -> NodeId {
        self.note_duplicate(self.emit, "emit");
        let emit = self.arena.create("emit");
        self.party(emit, input.tax_id.as_ref());
        self.required(emit, "IE", &input.state_registration);
        self.required(emit, "xNome", &input.name);
        self.optional(emit, "xFant", input.trade_name.as_deref());
        self.emit = Some(emit);
        self.place(self.inf, emit);
        emit
    }

    /// `emit/enderEmit`: issuer address.
    pub fn tag_ender_emit(&mut self, input: &AddressInput) -> NodeId {
        let node = self.arena.create("enderEmit");
        self.required(node, "xLgr", &input.street);
        self.required(node, "nro", &input.number);
        self.optional(node, "xCpl", input.complement.as_deref());
        self.required(node, "xBairro", &input.district);
        self.required(node, "cMun", &input.municipality_code);
        self.required(node, "xMun", &input.municipality);
        self.optional(node, "CEP", input.postal_code.as_deref());
        self.required(node, "UF", &input.uf);
        self.optional(node, "fone", input.phone.as_deref());
        self.optional(node, "email", input.email.as_deref());
        self.attach(Parent::Emit, node);
        node
    }

    // ─── Trailing groups ─────────────────────────────────────────────

    /// `seg`: cargo insurance.
    pub fn tag_seg(&mut self, input: &InsuranceInput) -> NodeId {
        let seg = self.arena.create("seg");
        let resp = self.arena.create("infResp");
        self.required(resp, "respSeg", &input.responsible);
        if let Some(party) = &input.responsible_party {
            self.required(resp, party.tag(), party.value());
        }
        self.place(seg, resp);
        if input.insurer_name.is_some() || input.insurer_cnpj.is_some() {
            let insurer = self.arena.create("infSeg");
            self.required(insurer, "xSeg", input.insurer_name.as_deref().unwrap_or_default());
            self.required(insurer, "CNPJ", input.insurer_cnpj.as_deref().unwrap_or_default());
            self.place(seg, insurer);
        }
        self.optional(seg, "nApol", input.policy_number.as_deref());
        for endorsement in &input.endorsements {
            self.required(seg, "nAver", endorsement);
        }
        self.place(self.inf, seg);
        seg
    }

    /// `prodPred`: dominant product.
    pub fn tag_prod_pred(&mut self, input: &DominantProductInput) -> NodeId {
        self.note_duplicate(self.prod_pred, "prodPred");
        let node = self.arena.create("prodPred");
        self.required(node, "tpCarga", &input.cargo_type);
        self.required(node, "xProd", &input.description);
        self.optional(node, "cEAN", input.ean.as_deref());
        self.optional(node, "NCM", input.ncm.as_deref());
        self.prod_pred = Some(node);
        self.place(self.inf, node);
        node
    }

    /// `prodPred/infLotacao`: full-load pickup and drop-off locations.
    pub fn tag_inf_lotacao(&mut self, input: &FullLoadInput) -> NodeId {
        let node = self.arena.create("infLotacao");
        self.location(node, "infLocalCarrega", &input.loading);
        self.location(node, "infLocalDescarrega", &input.unloading);
        self.full_load = true;
        self.attach(Parent::ProdPred, node);
        node
    }

    fn location(&mut self, parent: NodeId, group: &'static str, input: &LocationInput) {
        let node = self.arena.create(group);
        match input.postal_code.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(cep) => self.required(node, "CEP", cep),
            None => {
                self.required(node, "latitude", input.latitude.as_deref().unwrap_or_default());
                self.required(node, "longitude", input.longitude.as_deref().unwrap_or_default());
            }
        }
        self.place(parent, node);
    }

    /// `tot`: totals.
    pub fn tag_tot(&mut self, input: &TotalsInput) -> NodeId {
        self.note_duplicate(self.tot, "tot");
        let tot = self.arena.create("tot");
        self.optional(tot, "qCTe", input.cte_count.as_deref());
        self.optional(tot, "qNFe", input.nfe_count.as_deref());
        self.optional(tot, "qMDFe", input.mdfe_count.as_deref());
        self.required(tot, "vCarga", &input.cargo_value);
        self.required(tot, "cUnid", &input.weight_unit);
        self.required(tot, "qCarga", &input.gross_weight);
        self.tot = Some(tot);
        self.place(self.inf, tot);
        tot
    }

    /// `lacres`: a manifest-level seal.
    pub fn tag_lacres(&mut self, number: &str) -> NodeId {
        self.seal(self.inf, "lacres", number)
    }

    /// `autXML`: a party authorized to download the document.
    pub fn tag_aut_xml(&mut self, party: &PartyId) -> NodeId {
        let node = self.arena.create("autXML");
        self.required(node, party.tag(), party.value());
        self.place(self.inf, node);
        node
    }

    /// `infAdic`: free-text additional information.
    pub fn tag_inf_adic(&mut self, input: &AdditionalInfoInput) -> NodeId {
        let node = self.arena.create("infAdic");
        self.optional(node, "infAdFisco", input.fiscal.as_deref());
        self.optional(node, "infCpl", input.taxpayer.as_deref());
        self.place(self.inf, node);
        node
    }

    /// `infRespTec`: technical responsible.
    pub fn tag_inf_resp_tec(&mut self, input: &TechnicalResponsibleInput) -> NodeId {
        let node = self.arena.create("infRespTec");
        self.required(node, "CNPJ", &input.cnpj);
        self.required(node, "xContato", &input.contact);
        self.required(node, "email", &input.email);
        self.required(node, "fone", &input.phone);
        self.place(self.inf, node);
        node
    }

    /// `infMDFeSupl`: an explicit QR code. Its URL is re-pointed at the
    /// derived key on build.
    pub fn tag_inf_mdfe_supl(&mut self, qr_code: &str) -> NodeId {
        let node = self.arena.create("infMDFeSupl");
        self.required(node, "qrCodMDFe", qr_code);
        self.place(self.root, node);
        node
    }

    // ─── Build ───────────────────────────────────────────────────────

    fn validate(&mut self) {
        for (slot, group) in [(self.ide, "ide"), (self.emit, "emit"), (self.tot, "tot")] {
            if slot.is_none() {
                self.errors.push(BuildError::MissingRequiredField {
                    field: group,
                    group: "infMDFe",
                });
            }
        }
        let Some(branch) = self.modal else {
            self.errors.push(BuildError::MissingRequiredField {
                field: "infModal",
                group: "infMDFe",
            });
            return;
        };
        let kind = branch.kind();
        if let Some(declared) = self.declared_modal.as_deref() {
            if declared != kind.code().to_string() {
                self.errors.push(BuildError::Validation(format!(
                    "ide/modal is {declared} but the modal block is {} ({kind})",
                    kind.code()
                )));
            }
        }
        if kind == ModalKind::Road {
            if matches!(self.issuer_type.as_deref(), Some("1" | "3")) && self.prod_pred.is_none() {
                self.errors.push(BuildError::Validation(
                    "prodPred is required on road manifests issued with tpEmit 1 or 3".to_string(),
                ));
            }
            if self.documents.len() == 1 && !self.full_load {
                self.errors.push(BuildError::Validation(
                    "infLotacao is required when a road manifest carries a single document"
                        .to_string(),
                ));
            }
        }
    }

    fn assemble_modal(&mut self) {
        let rodo = match self.modal {
            Some(ModalBranch::Road(rodo)) => Some(rodo),
            _ => None,
        };
        self.join_trailers(rodo);

        let Some(branch) = self.modal else { return };
        let inf_modal = self.arena.create("infModal");
        let version = self
            .arena
            .attribute(self.inf, "versao")
            .unwrap_or(DEFAULT_VERSION)
            .to_string();
        self.arena.set_attribute(inf_modal, "versaoModal", version);
        self.place(inf_modal, branch.node());
        self.place(self.inf, inf_modal);
    }

    fn flush_pending(&mut self) {
        for (parent, node) in std::mem::take(&mut self.pending) {
            match self.resolve(parent) {
                Some(p) => self.place(p, node),
                None => self.errors.push(BuildError::MissingParent {
                    group: self.arena.name(node).to_string(),
                    parent: parent.tag(),
                }),
            }
        }
    }

    fn apply_emission_type(&mut self) {
        let Some(ide) = self.ide else { return };
        let code = self.contingency.emission_type().code().to_string();
        match self.arena.first_child(ide, "tpEmis") {
            Some(node) => {
                if self.arena.text(node) != Some(code.as_str()) {
                    tracing::debug!(tp_emis = %code, "emission type taken from contingency state");
                }
                self.arena.set_text(node, code);
            }
            None => {
                let leaf = self.arena.create_leaf("tpEmis", code);
                self.place(ide, leaf);
            }
        }
    }

    /// Finish the manifest.
    ///
    /// Runs the cross-field rules, performs the deferred joins, forces
    /// `tpEmis` from contingency state, derives the access key (repairing
    /// `cDV` and `Id` when they disagree) and adds the QR code block when
    /// absent.
    ///
    /// # Errors
    ///
    /// Every problem collected since construction, in the order found.
    pub fn build(mut self) -> Result<ManifestDocument, BuildErrors> {
        self.validate();
        self.assemble_modal();
        self.assemble_documents();
        self.flush_pending();
        self.apply_emission_type();

        if !self.errors.is_empty() {
            return Err(BuildErrors(self.errors));
        }

        let mut root = self.arena.to_element(self.root);
        let document = finalize::heal_key(&mut root).and_then(|key| {
            finalize::refresh_qr_code(&mut root, &key, true);
            ManifestDocument::from_element(root)
        });
        document.map_err(|e| BuildErrors(vec![e]))
    }
}
