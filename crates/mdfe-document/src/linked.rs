//! # Linked Documents (`infDoc`)
//!
//! Unloading municipalities are registered under an item index; each
//! linked CT-e, NF-e or MDF-e names the municipality it is unloaded in.
//! Transport units, cargo units and hazardous products are templates
//! keyed by their own item index. At build time:
//!
//! 1. cargo units are cloned into every transport unit with their index;
//! 2. each linked document receives a clone of the transport units and
//!    hazardous products under its `transport_unit_item`;
//! 3. documents are moved under their municipality, and the
//!    municipalities under a fresh `infDoc`, in registration order.

use crate::arena::NodeId;
use crate::builder::ManifestBuilder;
use crate::error::BuildError;
use crate::groups::{
    CargoUnitInput, HazardousInput, LinkedDocumentInput, TransportUnitInput,
    UnloadingMunicipalityInput,
};

/// A linked document awaiting its municipality.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LinkedDocument {
    pub(crate) municipality: u32,
    pub(crate) transport_unit_item: Option<u32>,
    pub(crate) node: NodeId,
}

impl ManifestBuilder {
    /// `infDoc/infMunDescarga`, keyed by `item`. Registering the same item
    /// again replaces the earlier municipality.
    pub fn tag_inf_mun_descarga(&mut self, input: &UnloadingMunicipalityInput) -> NodeId {
        let node = self.arena.create("infMunDescarga");
        self.required(node, "cMunDescarga", &input.code);
        self.required(node, "xMunDescarga", &input.name);
        if !self.municipalities.replace(input.item, node).is_empty() {
            tracing::warn!(item = input.item, "unloading municipality replaced");
        }
        node
    }

    /// `infMunDescarga/infCTe`
    pub fn tag_inf_cte(&mut self, input: &LinkedDocumentInput) -> NodeId {
        self.linked_document("infCTe", "chCTe", input)
    }

    /// `infMunDescarga/infNFe`
    pub fn tag_inf_nfe(&mut self, input: &LinkedDocumentInput) -> NodeId {
        self.linked_document("infNFe", "chNFe", input)
    }

    /// `infMunDescarga/infMDFeTransp`
    pub fn tag_inf_mdfe_transp(&mut self, input: &LinkedDocumentInput) -> NodeId {
        self.linked_document("infMDFeTransp", "chMDFe", input)
    }

    fn linked_document(
        &mut self,
        group: &'static str,
        key_field: &'static str,
        input: &LinkedDocumentInput,
    ) -> NodeId {
        let node = self.arena.create(group);
        self.required(node, key_field, &input.key);
        self.optional(node, "SegCodBarra", input.barcode_segment.as_deref());
        self.optional(node, "indReentrega", input.redelivery.as_deref());
        self.documents.push(LinkedDocument {
            municipality: input.item,
            transport_unit_item: input.transport_unit_item,
            node,
        });
        node
    }

    /// `infUnidTransp` template, keyed by `item`.
    pub fn tag_inf_unid_transp(&mut self, input: &TransportUnitInput) -> NodeId {
        let node = self.arena.create("infUnidTransp");
        self.required(node, "tpUnidTransp", &input.kind);
        self.required(node, "idUnidTransp", &input.id);
        for seal in &input.seals {
            self.seal(node, "lacUnidTransp", seal);
        }
        self.optional(node, "qtdRat", input.apportioned_quantity.as_deref());
        self.transport_units.push(input.item, node);
        node
    }

    /// `infUnidCarga` template, keyed by the transport unit `item` it
    /// belongs to.
    pub fn tag_inf_unid_carga(&mut self, input: &CargoUnitInput) -> NodeId {
        let node = self.arena.create("infUnidCarga");
        self.required(node, "tpUnidCarga", &input.kind);
        self.required(node, "idUnidCarga", &input.id);
        for seal in &input.seals {
            self.seal(node, "lacUnidCarga", seal);
        }
        self.optional(node, "qtdRat", input.apportioned_quantity.as_deref());
        self.cargo_units.push(input.item, node);
        node
    }

    /// `peri` template, keyed by the `transport_unit_item` of the
    /// documents that carry it.
    pub fn tag_peri(&mut self, input: &HazardousInput) -> NodeId {
        let node = self.arena.create("peri");
        self.required(node, "nONU", &input.un_number);
        self.optional(node, "xNomeAE", input.shipping_name.as_deref());
        self.optional(node, "xClaRisco", input.risk_class.as_deref());
        self.optional(node, "grEmb", input.packing_group.as_deref());
        self.required(node, "qTotProd", &input.total_quantity);
        self.optional(node, "qVolTipo", input.volume_type.as_deref());
        self.hazardous.push(input.item, node);
        node
    }

    fn clone_into(&mut self, parent: NodeId, templates: &[NodeId]) {
        for template in templates {
            let copy = self.arena.deep_clone(*template);
            self.place(parent, copy);
        }
    }

    pub(crate) fn assemble_documents(&mut self) {
        let units: Vec<(u32, Vec<NodeId>)> = self
            .transport_units
            .iter()
            .map(|(item, ids)| (item, ids.to_vec()))
            .collect();
        for (item, ids) in &units {
            let cargo = self.cargo_units.get(*item).to_vec();
            for unit in ids {
                self.clone_into(*unit, &cargo);
            }
        }
        let stray_cargo: Vec<u32> = self
            .cargo_units
            .iter()
            .map(|(item, _)| item)
            .filter(|item| !self.transport_units.contains(*item))
            .collect();
        for item in stray_cargo {
            self.errors.push(BuildError::UnknownItem {
                group: "infUnidCarga",
                target: "infUnidTransp",
                item,
            });
        }

        let documents = std::mem::take(&mut self.documents);
        for doc in &documents {
            let group = self.arena.name(doc.node);
            if let Some(item) = doc.transport_unit_item {
                let units = self.transport_units.get(item).to_vec();
                let hazardous = self.hazardous.get(item).to_vec();
                if units.is_empty() && hazardous.is_empty() {
                    self.errors.push(BuildError::UnknownItem {
                        group,
                        target: "infUnidTransp",
                        item,
                    });
                }
                self.clone_into(doc.node, &units);
                self.clone_into(doc.node, &hazardous);
            }
            match self.municipalities.get(doc.municipality).first().copied() {
                Some(municipality) => self.place(municipality, doc.node),
                None => self.errors.push(BuildError::UnknownItem {
                    group,
                    target: "infMunDescarga",
                    item: doc.municipality,
                }),
            }
        }

        let unreferenced: Vec<u32> = self
            .hazardous
            .iter()
            .map(|(item, _)| item)
            .filter(|item| !documents.iter().any(|d| d.transport_unit_item == Some(*item)))
            .collect();
        for item in unreferenced {
            self.errors.push(BuildError::UnknownItem {
                group: "peri",
                target: "infUnidTransp",
                item,
            });
        }
        self.documents = documents;

        if self.municipalities.is_empty() {
            return;
        }
        let inf_doc = self.arena.create("infDoc");
        let municipalities: Vec<NodeId> = self
            .municipalities
            .iter()
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        for municipality in municipalities {
            self.place(inf_doc, municipality);
        }
        self.place(self.inf, inf_doc);
    }
}

#[cfg(test)]
mod tests {
    use mdfe_state::ContingencyHandle;

    use super::*;

    fn municipality(item: u32, name: &str) -> UnloadingMunicipalityInput {
        UnloadingMunicipalityInput {
            item,
            code: "4106902".into(),
            name: name.into(),
        }
    }

    fn cte(item: u32, unit: Option<u32>) -> LinkedDocumentInput {
        LinkedDocumentInput {
            item,
            key: "41140581452880000139570010000000011000000019".into(),
            transport_unit_item: unit,
            ..LinkedDocumentInput::default()
        }
    }

    fn unit(item: u32) -> TransportUnitInput {
        TransportUnitInput {
            item,
            kind: "1".into(),
            id: "ABC1234".into(),
            seals: vec!["L1".into()],
            ..TransportUnitInput::default()
        }
    }

    #[test]
    fn test_documents_join_their_municipality() {
        let mut b = ManifestBuilder::new(&ContingencyHandle::default());
        b.tag_inf_cte(&cte(2, None));
        b.tag_inf_mun_descarga(&municipality(1, "CURITIBA"));
        b.tag_inf_mun_descarga(&municipality(2, "LONDRINA"));
        b.tag_inf_nfe(&LinkedDocumentInput {
            key: "41140581452880000139550010000000011000000010".into(),
            ..cte(1, None)
        });
        b.assemble_documents();
        assert!(b.errors().is_empty());

        let inf = b.arena.to_element(b.inf);
        let inf_doc = inf.first_child("infDoc").unwrap();
        let muns: Vec<&str> = inf_doc
            .children
            .iter()
            .filter_map(|m| m.find_text(&["xMunDescarga"]))
            .collect();
        assert_eq!(muns, ["CURITIBA", "LONDRINA"]);
        assert!(inf_doc.children[0].first_child("infNFe").is_some());
        assert!(inf_doc.children[1].first_child("infCTe").is_some());
    }

    #[test]
    fn test_shared_transport_unit_is_cloned_per_document() {
        let mut b = ManifestBuilder::new(&ContingencyHandle::default());
        b.tag_inf_mun_descarga(&municipality(1, "CURITIBA"));
        b.tag_inf_unid_transp(&unit(5));
        b.tag_inf_unid_carga(&CargoUnitInput {
            item: 5,
            kind: "1".into(),
            id: "CONT0001".into(),
            ..CargoUnitInput::default()
        });
        b.tag_peri(&HazardousInput {
            item: 5,
            un_number: "1203".into(),
            total_quantity: "100".into(),
            ..HazardousInput::default()
        });
        let a = b.tag_inf_cte(&cte(1, Some(5)));
        let c = b.tag_inf_cte(&cte(1, Some(5)));
        b.assemble_documents();
        assert!(b.errors().is_empty());

        for doc in [a, c] {
            let el = b.arena.to_element(doc);
            let names: Vec<&str> = el.children.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(names, ["chCTe", "infUnidTransp", "peri"]);
            assert_eq!(
                el.find_text(&["infUnidTransp", "infUnidCarga", "idUnidCarga"]),
                Some("CONT0001")
            );
        }
        assert_ne!(b.arena.children(a)[1], b.arena.children(c)[1]);
    }

    #[test]
    fn test_unknown_municipality_is_reported() {
        let mut b = ManifestBuilder::new(&ContingencyHandle::default());
        b.tag_inf_mun_descarga(&municipality(1, "CURITIBA"));
        b.tag_inf_cte(&cte(3, None));
        b.assemble_documents();
        assert_eq!(
            b.errors(),
            &[BuildError::UnknownItem {
                group: "infCTe",
                target: "infMunDescarga",
                item: 3
            }]
        );
    }

    #[test]
    fn test_unknown_transport_unit_is_reported() {
        let mut b = ManifestBuilder::new(&ContingencyHandle::default());
        b.tag_inf_mun_descarga(&municipality(1, "CURITIBA"));
        b.tag_inf_cte(&cte(1, Some(8)));
        b.assemble_documents();
        assert_eq!(
            b.errors(),
            &[BuildError::UnknownItem {
                group: "infCTe",
                target: "infUnidTransp",
                item: 8
            }]
        );
    }
}
