//! Road modal (`rodo`) groups.
//!
//! Trailers and their owners are keyed by item index and joined at build
//! time: the owner registered for an item is cloned into each trailer with
//! that index.

use crate::arena::NodeId;
use crate::builder::{ManifestBuilder, Parent};
use crate::error::BuildError;
use crate::groups::{
    AnttInput, CiotInput, ContractorInput, DriverInput, OwnerInput, PartyId, PaymentInput,
    RoadInput, TollDeviceInput, TrailerInput, VehicleInput,
};
use crate::modal::ModalBranch;

impl ManifestBuilder {
    /// `rodo`: opens the road modal.
    pub fn tag_rodo(&mut self, input: &RoadInput) -> NodeId {
        let rodo = self.arena.create("rodo");
        self.optional(rodo, "codAgPorto", input.port_agency_code.as_deref());
        self.open_modal(ModalBranch::Road(rodo));
        rodo
    }

    /// `rodo/infANTT`: regulatory block.
    pub fn tag_inf_antt(&mut self, input: &AnttInput) -> NodeId {
        self.note_duplicate(self.inf_antt, "infANTT");
        let node = self.arena.create("infANTT");
        self.optional(node, "RNTRC", input.rntrc.as_deref());
        self.inf_antt = Some(node);
        self.attach(Parent::Rodo, node);
        node
    }

    /// `infANTT/infCIOT`
    pub fn tag_inf_ciot(&mut self, input: &CiotInput) -> NodeId {
        let node = self.arena.create("infCIOT");
        self.required(node, "CIOT", &input.ciot);
        self.party(node, input.party.as_ref());
        self.attach(Parent::InfAntt, node);
        node
    }

    /// `infANTT/valePed`: toll vouchers, one `disp` per device.
    pub fn tag_vale_ped(&mut self, devices: &[TollDeviceInput]) -> NodeId {
        let node = self.arena.create("valePed");
        for device in devices {
            let disp = self.arena.create("disp");
            self.required(disp, "CNPJForn", &device.supplier_cnpj);
            match &device.payer {
                Some(PartyId::Cnpj(v)) => self.required(disp, "CNPJPg", v),
                Some(PartyId::Cpf(v)) => self.required(disp, "CPFPg", v),
                Some(other) => self.errors.push(BuildError::SchemaOrder {
                    parent: "disp".to_string(),
                    child: other.tag().to_string(),
                }),
                None => {}
            }
            self.optional(disp, "nCompra", device.purchase_number.as_deref());
            self.required(disp, "vValePed", &device.amount);
            self.optional(disp, "tpValePed", device.kind.as_deref());
            self.place(node, disp);
        }
        self.attach(Parent::InfAntt, node);
        node
    }

    /// `infANTT/infContratante`
    pub fn tag_inf_contratante(&mut self, input: &ContractorInput) -> NodeId {
        let node = self.arena.create("infContratante");
        self.optional(node, "xNome", input.name.as_deref());
        self.party(node, input.party.as_ref());
        self.attach(Parent::InfAntt, node);
        node
    }

    /// `infANTT/infPag`: freight payment. Instalments are only written for
    /// payment on term (`indPag` 1).
    pub fn tag_inf_pag(&mut self, input: &PaymentInput) -> NodeId {
        let node = self.arena.create("infPag");
        self.optional(node, "xNome", input.name.as_deref());
        self.party(node, input.party.as_ref());
        for component in &input.components {
            let comp = self.arena.create("Comp");
            self.required(comp, "tpComp", &component.kind);
            self.required(comp, "vComp", &component.value);
            self.optional(comp, "xComp", component.description.as_deref());
            self.place(node, comp);
        }
        self.required(node, "vContrato", &input.contract_value);
        self.optional(node, "indAltoDesemp", input.high_performance.as_deref());
        self.required(node, "indPag", &input.payment_indicator);
        self.optional(node, "vAdiant", input.advance.as_deref());
        if input.payment_indicator.trim() == "1" {
            for installment in &input.installments {
                let prazo = self.arena.create("infPrazo");
                self.required(prazo, "nParcela", &installment.number);
                self.required(prazo, "dVenc", &installment.due_date);
                self.required(prazo, "vParcela", &installment.value);
                self.place(node, prazo);
            }
        }
        let bank = self.arena.create("infBanc");
        match input.bank.ipef_cnpj.as_deref().filter(|v| !v.trim().is_empty()) {
            Some(cnpj) => self.required(bank, "CNPJIPEF", cnpj),
            None => {
                self.required(bank, "codBanco", input.bank.bank_code.as_deref().unwrap_or_default());
                self.required(
                    bank,
                    "codAgencia",
                    input.bank.agency_code.as_deref().unwrap_or_default(),
                );
            }
        }
        self.place(node, bank);
        self.attach(Parent::InfAntt, node);
        node
    }

    /// `rodo/veicTracao`: traction vehicle.
    pub fn tag_veic_tracao(&mut self, input: &VehicleInput) -> NodeId {
        self.note_duplicate(self.veic_tracao, "veicTracao");
        let node = self.arena.create("veicTracao");
        self.optional(node, "cInt", input.internal_code.as_deref());
        self.required(node, "placa", &input.plate);
        self.optional(node, "RENAVAM", input.renavam.as_deref());
        self.required(node, "tara", &input.tare);
        self.optional(node, "capKG", input.capacity_kg.as_deref());
        self.optional(node, "capM3", input.capacity_m3.as_deref());
        self.required(node, "tpRod", &input.wheel_type);
        self.required(node, "tpCar", &input.body_type);
        self.optional(node, "UF", input.uf.as_deref());
        self.veic_tracao = Some(node);
        self.attach(Parent::Rodo, node);
        node
    }

    fn owner(&mut self, input: &OwnerInput) -> NodeId {
        let node = self.arena.create("prop");
        self.party(node, input.party.as_ref());
        self.required(node, "RNTRC", &input.rntrc);
        self.required(node, "xNome", &input.name);
        self.optional(node, "IE", input.state_registration.as_deref());
        self.optional(node, "UF", input.uf.as_deref());
        self.required(node, "tpProp", &input.owner_type);
        node
    }

    /// `veicTracao/prop`: owner of the traction vehicle. `item` is ignored.
    pub fn tag_veic_tracao_prop(&mut self, input: &OwnerInput) -> NodeId {
        let node = self.owner(input);
        self.attach(Parent::VeicTracao, node);
        node
    }

    /// `veicTracao/condutor`: a driver.
    pub fn tag_condutor(&mut self, input: &DriverInput) -> NodeId {
        let node = self.arena.create("condutor");
        self.required(node, "xNome", &input.name);
        self.required(node, "CPF", &input.cpf);
        self.attach(Parent::VeicTracao, node);
        node
    }

    /// `rodo/veicReboque`: a trailer, keyed by `item`.
    pub fn tag_veic_reboque(&mut self, input: &TrailerInput) -> NodeId {
        let node = self.arena.create("veicReboque");
        self.optional(node, "cInt", input.internal_code.as_deref());
        self.required(node, "placa", &input.plate);
        self.optional(node, "RENAVAM", input.renavam.as_deref());
        self.required(node, "tara", &input.tare);
        self.required(node, "capKG", &input.capacity_kg);
        self.optional(node, "capM3", input.capacity_m3.as_deref());
        self.required(node, "tpCar", &input.body_type);
        self.optional(node, "UF", input.uf.as_deref());
        self.trailers.push(input.item, node);
        node
    }

    /// `veicReboque/prop`: owner of the trailers registered under
    /// `item`. A later owner for the same item replaces the earlier one.
    pub fn tag_veic_reboque_prop(&mut self, input: &OwnerInput) -> NodeId {
        let node = self.owner(input);
        if !self.trailer_owners.replace(input.item, node).is_empty() {
            tracing::debug!(item = input.item, "trailer owner replaced");
        }
        node
    }

    /// `rodo/lacRodo`: a road seal.
    pub fn tag_lac_rodo(&mut self, number: &str) -> NodeId {
        let node = self.arena.create("lacRodo");
        self.required(node, "nLacre", number);
        self.attach(Parent::Rodo, node);
        node
    }

    /// Clone each trailer's owner into it and hang the trailers on `rodo`.
    pub(crate) fn join_trailers(&mut self, rodo: Option<NodeId>) {
        let trailers: Vec<(u32, Vec<NodeId>)> = self
            .trailers
            .iter()
            .map(|(item, ids)| (item, ids.to_vec()))
            .collect();
        for (item, ids) in trailers {
            let owner = self.trailer_owners.get(item).first().copied();
            for trailer in ids {
                if let Some(owner) = owner {
                    let copy = self.arena.deep_clone(owner);
                    self.place(trailer, copy);
                }
                match rodo {
                    Some(rodo) => self.place(rodo, trailer),
                    None => self.errors.push(BuildError::MissingParent {
                        group: "veicReboque".to_string(),
                        parent: "rodo",
                    }),
                }
            }
        }
        let orphans: Vec<u32> = self
            .trailer_owners
            .iter()
            .map(|(item, _)| item)
            .filter(|item| !self.trailers.contains(*item))
            .collect();
        for item in orphans {
            self.errors.push(BuildError::UnknownItem {
                group: "prop",
                target: "veicReboque",
                item,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use mdfe_state::ContingencyHandle;

    use super::*;
    use crate::groups::{BankInput, PaymentComponentInput};

    fn owner(item: u32, name: &str) -> OwnerInput {
        OwnerInput {
            item,
            party: Some(PartyId::Cpf("12345678901".into())),
            rntrc: "12345678".into(),
            name: name.into(),
            owner_type: "0".into(),
            ..OwnerInput::default()
        }
    }

    fn trailer(item: u32, plate: &str) -> TrailerInput {
        TrailerInput {
            item,
            plate: plate.into(),
            tare: "3000".into(),
            capacity_kg: "20000".into(),
            body_type: "02".into(),
            ..TrailerInput::default()
        }
    }

    #[test]
    fn test_trailer_owner_is_cloned_into_matching_trailers() {
        let mut b = ManifestBuilder::new(&ContingencyHandle::default());
        let rodo = b.tag_rodo(&RoadInput::default());
        b.tag_veic_reboque_prop(&owner(1, "DONO UM"));
        let first = b.tag_veic_reboque(&trailer(1, "AAA1111"));
        let second = b.tag_veic_reboque(&trailer(2, "BBB2222"));
        b.join_trailers(Some(rodo));
        assert!(b.errors().is_empty());

        let el = b.arena.to_element(rodo);
        let trailers = el.children_named("veicReboque").collect::<Vec<_>>();
        assert_eq!(trailers.len(), 2);
        assert_eq!(trailers[0].find_text(&["prop", "xNome"]), Some("DONO UM"));
        assert!(trailers[1].first_child("prop").is_none());
        // prop sits between capM3/capKG and tpCar
        let names: Vec<&str> = trailers[0].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["placa", "tara", "capKG", "prop", "tpCar"]);
        assert_ne!(first, second);
    }

    #[test]
    fn test_owner_without_trailer_is_unknown_item() {
        let mut b = ManifestBuilder::new(&ContingencyHandle::default());
        let rodo = b.tag_rodo(&RoadInput::default());
        b.tag_veic_reboque_prop(&owner(9, "NINGUEM"));
        b.join_trailers(Some(rodo));
        assert_eq!(
            b.errors(),
            &[BuildError::UnknownItem {
                group: "prop",
                target: "veicReboque",
                item: 9
            }]
        );
    }

    #[test]
    fn test_inf_pag_writes_installments_only_on_term() {
        let mut b = ManifestBuilder::new(&ContingencyHandle::default());
        let input = PaymentInput {
            party: Some(PartyId::Cnpj("81452880000139".into())),
            components: vec![PaymentComponentInput {
                kind: "01".into(),
                value: "100.00".into(),
                description: None,
            }],
            contract_value: "100.00".into(),
            payment_indicator: "0".into(),
            installments: vec![Default::default()],
            bank: BankInput {
                ipef_cnpj: Some("11222333000181".into()),
                ..BankInput::default()
            },
            ..PaymentInput::default()
        };
        let node = b.tag_inf_pag(&input);
        assert!(b.errors().is_empty());
        let el = b.arena.to_element(node);
        assert!(el.first_child("infPrazo").is_none());
        assert_eq!(el.find_text(&["infBanc", "CNPJIPEF"]), Some("11222333000181"));
    }

    #[test]
    fn test_foreign_ciot_party_is_schema_error() {
        let mut b = ManifestBuilder::new(&ContingencyHandle::default());
        b.tag_inf_ciot(&CiotInput {
            ciot: "123456789012".into(),
            party: Some(PartyId::Foreign("X1".into())),
        });
        assert!(matches!(
            b.errors(),
            [BuildError::SchemaOrder { parent, child }] if parent == "infCIOT" && child == "idEstrangeiro"
        ));
    }
}
