use extrato_ingest::{StatementParser, parse_statement_pages};

#[test]
fn test_end_to_end_debit_line() {
    let page = "12/09 4532 SUPERMERCADO ABC 123,45";
    let tables = parse_statement_pages(&[page]).unwrap();

    assert_eq!(tables.transactions.len(), 1);
    let row = &tables.transactions[0];
    assert_eq!(row.date, "12/09");
    assert_eq!(row.description, "SUPERMERCADO ABC");
    assert_eq!(row.amount, 123.45);

    let json = serde_json::to_value(row).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"Data": "12/09", "Estabelecimento": "SUPERMERCADO ABC", "Valor": 123.45})
    );
}

#[test]
fn test_credit_card_invoice_page() {
    let page = r#"
Resumo da fatura                              Vencimento 10/10
Lançamentos: compras e saques
DATA   CARTÃO  ESTABELECIMENTO                       VALOR
03/09  4532    PADARIA PÃO QUENTE                    18,90
04/09  4532    AMAZON MARKETPLACE                    1.249,00
05/09  4532    IFOOD *RESTAURANTE                    62,35
Total dos lançamentos atuais                          1.330,25
"#;
    let parser = StatementParser::new().unwrap();
    let tables = parser.parse_page(page);

    assert_eq!(tables.transactions.len(), 3);
    assert!(tables.beneficiaries.is_empty());
    assert_eq!(tables.transactions[0].description, "PADARIA PÃO QUENTE");
    assert_eq!(tables.transactions[1].amount, 1249.0);
    assert_eq!(tables.total_transactions(), 1330.25);
}

#[test]
fn test_bank_statement_with_transfers() {
    let pages = [
        "05/09 PIX ENVIO MARIA OLIVEIRA 00000000 0001 998877-0 250,00",
        "06/09 PIX ENVIO CONDOMÍNIO ED. SOL 60701190 3344 12-3 780,40\n07/09 TED DOC PADRAO JOSÉ 00360305 1234 5678-9 1.000,00",
    ];
    let tables = parse_statement_pages(&pages).unwrap();

    let names: Vec<_> = tables.beneficiaries.iter().map(|b| b.beneficiary.as_str()).collect();
    assert_eq!(names, vec!["MARIA OLIVEIRA", "CONDOMÍNIO ED. SOL", "PADRAO JOSÉ"]);
    assert_eq!(tables.total_beneficiaries(), 2030.4);
}
