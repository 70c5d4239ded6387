//! # Modal Blocks
//!
//! A manifest carries exactly one modal block. [`ModalBranch`] is the sum
//! type the builder holds once a modal is opened; road groups live in
//! `road.rs`, the air, water and rail groups here.

use serde::{Deserialize, Serialize};

use crate::arena::NodeId;
use crate::builder::{ManifestBuilder, Parent};
use crate::error::BuildError;
use crate::groups::{
    AirInput, ConvoyInput, EmptyUnitInput, RailInput, TerminalInput, WagonInput, WaterInput,
};

/// Transport modal (`ide/modal`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModalKind {
    /// 1: road (`rodo`).
    Road,
    /// 2: air (`aereo`).
    Air,
    /// 3: water (`aquav`).
    Water,
    /// 4: rail (`ferrov`).
    Rail,
}

impl ModalKind {
    /// Numeric `ide/modal` code.
    pub fn code(self) -> u8 {
        match self {
            Self::Road => 1,
            Self::Air => 2,
            Self::Water => 3,
            Self::Rail => 4,
        }
    }

    /// Look up a modal by its numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Road),
            2 => Some(Self::Air),
            3 => Some(Self::Water),
            4 => Some(Self::Rail),
            _ => None,
        }
    }

    /// Element name of the modal block.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Road => "rodo",
            Self::Air => "aereo",
            Self::Water => "aquav",
            Self::Rail => "ferrov",
        }
    }
}

impl std::fmt::Display for ModalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Road => f.write_str("ROAD"),
            Self::Air => f.write_str("AIR"),
            Self::Water => f.write_str("WATER"),
            Self::Rail => f.write_str("RAIL"),
        }
    }
}

/// The modal block opened on a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalBranch {
    /// `rodo`
    Road(NodeId),
    /// `aereo`
    Air(NodeId),
    /// `aquav`
    Water(NodeId),
    /// `ferrov`
    Rail(NodeId),
}

impl ModalBranch {
    /// Which modal this is.
    pub fn kind(self) -> ModalKind {
        match self {
            Self::Road(_) => ModalKind::Road,
            Self::Air(_) => ModalKind::Air,
            Self::Water(_) => ModalKind::Water,
            Self::Rail(_) => ModalKind::Rail,
        }
    }

    /// Root node of the block.
    pub fn node(self) -> NodeId {
        match self {
            Self::Road(n) | Self::Air(n) | Self::Water(n) | Self::Rail(n) => n,
        }
    }
}

impl ManifestBuilder {
    pub(crate) fn open_modal(&mut self, branch: ModalBranch) {
        match self.modal {
            Some(existing) => self.errors.push(BuildError::ConflictingModal {
                existing: existing.kind(),
                requested: branch.kind(),
            }),
            None => self.modal = Some(branch),
        }
    }

    // ─── Air ─────────────────────────────────────────────────────────

    /// `aereo`: opens the air modal.
    pub fn tag_aereo(&mut self, input: &AirInput) -> NodeId {
        let aereo = self.arena.create("aereo");
        self.required(aereo, "nac", &input.nationality);
        self.required(aereo, "matr", &input.registration);
        self.required(aereo, "nVoo", &input.flight);
        self.required(aereo, "cAerEmb", &input.departure_airport);
        self.required(aereo, "cAerDes", &input.destination_airport);
        self.required(aereo, "dVoo", &input.flight_date);
        self.open_modal(ModalBranch::Air(aereo));
        aereo
    }

    // ─── Water ───────────────────────────────────────────────────────

    /// `aquav`: opens the water modal.
    pub fn tag_aquav(&mut self, input: &WaterInput) -> NodeId {
        let aquav = self.arena.create("aquav");
        self.required(aquav, "irin", &input.irin);
        self.required(aquav, "tpEmb", &input.vessel_type);
        self.required(aquav, "cEmbar", &input.vessel_code);
        self.required(aquav, "xEmbar", &input.vessel_name);
        self.required(aquav, "nViag", &input.voyage);
        self.required(aquav, "cPrtEmb", &input.port_of_loading);
        self.required(aquav, "cPrtDest", &input.port_of_destination);
        self.optional(aquav, "prtTrans", input.transshipment_port.as_deref());
        self.optional(aquav, "tpNav", input.navigation_type.as_deref());
        self.open_modal(ModalBranch::Water(aquav));
        aquav
    }

    /// `infTermCarreg`: loading terminal.
    pub fn tag_inf_term_carreg(&mut self, input: &TerminalInput) -> NodeId {
        let node = self.arena.create("infTermCarreg");
        self.required(node, "cTermCarreg", &input.code);
        self.required(node, "xTermCarreg", &input.name);
        self.attach(Parent::Aquav, node);
        node
    }

    /// `infTermDescarreg`: unloading terminal.
    pub fn tag_inf_term_descarreg(&mut self, input: &TerminalInput) -> NodeId {
        let node = self.arena.create("infTermDescarreg");
        self.required(node, "cTermDescarreg", &input.code);
        self.required(node, "xTermDescarreg", &input.name);
        self.attach(Parent::Aquav, node);
        node
    }

    /// `infEmbComb`: convoy vessel.
    pub fn tag_inf_emb_comb(&mut self, input: &ConvoyInput) -> NodeId {
        let node = self.arena.create("infEmbComb");
        self.required(node, "cEmbComb", &input.vessel_code);
        self.required(node, "xBalsa", &input.barge);
        self.attach(Parent::Aquav, node);
        node
    }

    /// `infUnidCargaVazia`: empty cargo unit.
    pub fn tag_inf_unid_carga_vazia(&mut self, input: &EmptyUnitInput) -> NodeId {
        let node = self.arena.create("infUnidCargaVazia");
        self.required(node, "idUnidCargaVazia", &input.id);
        self.required(node, "tpUnidCargaVazia", &input.kind);
        self.attach(Parent::Aquav, node);
        node
    }

    /// `infUnidTranspVazia`: empty transport unit.
    pub fn tag_inf_unid_transp_vazia(&mut self, input: &EmptyUnitInput) -> NodeId {
        let node = self.arena.create("infUnidTranspVazia");
        self.required(node, "idUnidTranspVazia", &input.id);
        self.required(node, "tpUnidTranspVazia", &input.kind);
        self.attach(Parent::Aquav, node);
        node
    }

    // ─── Rail ────────────────────────────────────────────────────────

    /// `ferrov/trem`: opens the rail modal.
    pub fn tag_ferrov(&mut self, input: &RailInput) -> NodeId {
        let ferrov = self.arena.create("ferrov");
        let trem = self.arena.create("trem");
        self.required(trem, "xPref", &input.prefix);
        self.optional(trem, "dhTrem", input.departed_at.as_deref());
        self.required(trem, "xOri", &input.origin);
        self.required(trem, "xDest", &input.destination);
        self.required(trem, "qVag", &input.wagon_count);
        self.place(ferrov, trem);
        self.open_modal(ModalBranch::Rail(ferrov));
        ferrov
    }

    /// `vag`: a wagon.
    pub fn tag_vag(&mut self, input: &WagonInput) -> NodeId {
        let vag = self.arena.create("vag");
        self.required(vag, "pesoBC", &input.base_weight);
        self.required(vag, "pesoR", &input.actual_weight);
        self.optional(vag, "tpVag", input.kind.as_deref());
        self.required(vag, "serie", &input.series);
        self.required(vag, "nVag", &input.number);
        self.optional(vag, "nSeq", input.sequence.as_deref());
        self.required(vag, "TU", &input.useful_tonnage);
        self.attach(Parent::Ferrov, vag);
        vag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modal_codes_roundtrip() {
        for kind in [ModalKind::Road, ModalKind::Air, ModalKind::Water, ModalKind::Rail] {
            assert_eq!(ModalKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ModalKind::from_code(5), None);
    }

    #[test]
    fn test_modal_tags() {
        assert_eq!(ModalKind::Road.tag(), "rodo");
        assert_eq!(ModalKind::Rail.to_string(), "RAIL");
    }
}
