//! # Schema Slot Tables
//!
//! For every group the builder assembles, the ordered list of child slots
//! the layout allows. The arena places each new child immediately before
//! the first existing sibling whose slot comes later, so serialized order
//! is a function of the schema and never of call order.
//!
//! Groups absent from this table are leaves.

/// Ordered child slots of `group`, or `None` for a leaf.
pub fn slots(group: &str) -> Option<&'static [&'static str]> {
    let slots: &'static [&'static str] = match group {
        "MDFe" => &["infMDFe", "infMDFeSupl", "Signature"],
        "infMDFe" => &[
            "ide", "emit", "infModal", "infDoc", "seg", "prodPred", "tot", "lacres", "autXML",
            "infAdic", "infRespTec",
        ],
        "ide" => &[
            "cUF",
            "tpAmb",
            "tpEmit",
            "tpTransp",
            "mod",
            "serie",
            "nMDF",
            "cMDF",
            "cDV",
            "modal",
            "dhEmi",
            "tpEmis",
            "procEmi",
            "verProc",
            "UFIni",
            "UFFim",
            "infMunCarrega",
            "infPercurso",
            "dhIniViagem",
            "indCanalVerde",
            "indCarregaPosterior",
        ],
        "infMunCarrega" => &["cMunCarrega", "xMunCarrega"],
        "infPercurso" => &["UFPer"],
        "emit" => &["CNPJ", "CPF", "IE", "xNome", "xFant", "enderEmit"],
        "enderEmit" => &[
            "xLgr", "nro", "xCpl", "xBairro", "cMun", "xMun", "CEP", "UF", "fone", "email",
        ],

        // ── modal ──
        "infModal" => &["rodo", "aereo", "aquav", "ferrov"],
        "rodo" => &["infANTT", "veicTracao", "veicReboque", "codAgPorto", "lacRodo"],
        "infANTT" => &["RNTRC", "infCIOT", "valePed", "infContratante", "infPag"],
        "infCIOT" => &["CIOT", "CPF", "CNPJ"],
        "valePed" => &["disp", "categCombVeic"],
        "disp" => &["CNPJForn", "CNPJPg", "CPFPg", "nCompra", "vValePed", "tpValePed"],
        "infContratante" => &["xNome", "CPF", "CNPJ", "idEstrangeiro"],
        "infPag" => &[
            "xNome",
            "CPF",
            "CNPJ",
            "idEstrangeiro",
            "Comp",
            "vContrato",
            "indAltoDesemp",
            "indPag",
            "vAdiant",
            "infPrazo",
            "infBanc",
        ],
        "Comp" => &["tpComp", "vComp", "xComp"],
        "infPrazo" => &["nParcela", "dVenc", "vParcela"],
        "infBanc" => &["codBanco", "codAgencia", "CNPJIPEF"],
        "veicTracao" => &[
            "cInt", "placa", "RENAVAM", "tara", "capKG", "capM3", "prop", "condutor", "tpRod",
            "tpCar", "UF",
        ],
        "veicReboque" => &[
            "cInt", "placa", "RENAVAM", "tara", "capKG", "capM3", "prop", "tpCar", "UF",
        ],
        "prop" => &["CPF", "CNPJ", "RNTRC", "xNome", "IE", "UF", "tpProp"],
        "condutor" => &["xNome", "CPF"],
        "aereo" => &["nac", "matr", "nVoo", "cAerEmb", "cAerDes", "dVoo"],
        "aquav" => &[
            "irin",
            "tpEmb",
            "cEmbar",
            "xEmbar",
            "nViag",
            "cPrtEmb",
            "cPrtDest",
            "prtTrans",
            "tpNav",
            "infTermCarreg",
            "infTermDescarreg",
            "infEmbComb",
            "infUnidCargaVazia",
            "infUnidTranspVazia",
        ],
        "infTermCarreg" => &["cTermCarreg", "xTermCarreg"],
        "infTermDescarreg" => &["cTermDescarreg", "xTermDescarreg"],
        "infEmbComb" => &["cEmbComb", "xBalsa"],
        "infUnidCargaVazia" => &["idUnidCargaVazia", "tpUnidCargaVazia"],
        "infUnidTranspVazia" => &["idUnidTranspVazia", "tpUnidTranspVazia"],
        "ferrov" => &["trem", "vag"],
        "trem" => &["xPref", "dhTrem", "xOri", "xDest", "qVag"],
        "vag" => &["pesoBC", "pesoR", "tpVag", "serie", "nVag", "nSeq", "TU"],

        // ── linked documents ──
        "infDoc" => &["infMunDescarga"],
        "infMunDescarga" => &[
            "cMunDescarga",
            "xMunDescarga",
            "infCTe",
            "infNFe",
            "infMDFeTransp",
        ],
        "infCTe" => &["chCTe", "SegCodBarra", "indReentrega", "infUnidTransp", "peri"],
        "infNFe" => &["chNFe", "SegCodBarra", "indReentrega", "infUnidTransp", "peri"],
        "infMDFeTransp" => &["chMDFe", "indReentrega", "infUnidTransp", "peri"],
        "infUnidTransp" => &[
            "tpUnidTransp",
            "idUnidTransp",
            "lacUnidTransp",
            "infUnidCarga",
            "qtdRat",
        ],
        "lacUnidTransp" | "lacUnidCarga" | "lacres" | "lacRodo" => &["nLacre"],
        "infUnidCarga" => &["tpUnidCarga", "idUnidCarga", "lacUnidCarga", "qtdRat"],
        "peri" => &["nONU", "xNomeAE", "xClaRisco", "grEmb", "qTotProd", "qVolTipo"],

        // ── trailing groups ──
        "seg" => &["infResp", "infSeg", "nApol", "nAver"],
        "infResp" => &["respSeg", "CNPJ", "CPF"],
        "infSeg" => &["xSeg", "CNPJ"],
        "prodPred" => &["tpCarga", "xProd", "cEAN", "NCM", "infLotacao"],
        "infLotacao" => &["infLocalCarrega", "infLocalDescarrega"],
        "infLocalCarrega" | "infLocalDescarrega" => &["CEP", "latitude", "longitude"],
        "tot" => &["qCTe", "qNFe", "qMDFe", "vCarga", "cUnid", "qCarga"],
        "autXML" => &["CNPJ", "CPF"],
        "infAdic" => &["infAdFisco", "infCpl"],
        "infRespTec" => &["CNPJ", "xContato", "email", "fone", "idCSRT", "hashCSRT"],
        "infMDFeSupl" => &["qrCodMDFe"],
        _ => return None,
    };
    Some(slots)
}

/// Position of `child` within `group`'s slots.
pub fn slot_rank(group: &str, child: &str) -> Option<usize> {
    slots(group)?.iter().position(|s| *s == child)
}
