// Unit tests for survey document extraction.
//
// The state machine runs on in-memory paragraphs; the last tests build a
// real .docx with docx-rs in the temp directory and read it back.

use artscope::extract::{
    extract_file, extract_records, write_records_csv, ExtractConfig, NameDetection, Paragraph,
    QUESTION_1, QUESTION_2,
};

fn scratch(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("artscope_extract_{}_{name}", std::process::id()))
}

// ============================================================
// extract_records state machine
// ============================================================

#[test]
fn heading_template_and_three_paragraphs_make_one_record() {
    let paragraphs = vec![
        Paragraph::heading("Galerie du Port"),
        Paragraph::plain(QUESTION_1),
        Paragraph::plain("Nous accueillons des artistes."),
        Paragraph::plain("Le lieu est ouvert au public."),
        Paragraph::plain("Les ateliers sont gratuits."),
    ];
    let records = extract_records(&paragraphs, &ExtractConfig::default());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Galerie du Port");
    assert_eq!(records[0].pairs.len(), 1);
    assert_eq!(records[0].pairs[0].question, QUESTION_1);
    assert_eq!(
        records[0].pairs[0].answer,
        "Nous accueillons des artistes. Le lieu est ouvert au public. Les ateliers sont gratuits."
    );
}

#[test]
fn question_with_small_typos_still_matches() {
    let typed = QUESTION_2.replace("œuvre", "oeuvre").replace("Et si", "et si");
    let paragraphs = vec![
        Paragraph::heading("Friche"),
        Paragraph::plain(typed),
        Paragraph::plain("Oui, collectivement."),
    ];
    let records = extract_records(&paragraphs, &ExtractConfig::default());
    assert_eq!(records.len(), 1);
    // The canonical template is recorded, not the typed variant
    assert_eq!(records[0].pairs[0].question, QUESTION_2);
}

#[test]
fn two_questions_in_document_order() {
    let paragraphs = vec![
        Paragraph::heading("Atelier Nord"),
        Paragraph::plain(QUESTION_1),
        Paragraph::plain("first answer"),
        Paragraph::plain(""),
        Paragraph::plain(QUESTION_2),
        Paragraph::plain("second answer"),
        Paragraph::heading("Atelier Sud"),
        Paragraph::plain(QUESTION_2),
        Paragraph::plain("only the second"),
    ];
    let records = extract_records(&paragraphs, &ExtractConfig::default());
    assert_eq!(records.len(), 2);
    let answers: Vec<&str> = records[0].pairs.iter().map(|p| p.answer.as_str()).collect();
    assert_eq!(answers, vec!["first answer", "second answer"]);
    assert_eq!(records[1].name, "Atelier Sud");
    assert_eq!(records[1].pairs[0].question, QUESTION_2);
}

#[test]
fn unrelated_paragraph_is_not_a_question() {
    let paragraphs = vec![
        Paragraph::heading("Espace"),
        Paragraph::plain("Présentation générale du lieu"),
        Paragraph::plain("not collected"),
    ];
    assert!(extract_records(&paragraphs, &ExtractConfig::default()).is_empty());
}

#[test]
fn titre_style_counts_as_heading() {
    let paragraphs = vec![
        Paragraph {
            text: "La Ruche".into(),
            style: Some("Titre2".into()),
            bold: false,
        },
        Paragraph::plain(QUESTION_1),
        Paragraph::plain("answer"),
    ];
    let records = extract_records(&paragraphs, &ExtractConfig::default());
    assert_eq!(records[0].name, "La Ruche");
}

#[test]
fn custom_threshold_rejects_loose_matches() {
    let config = ExtractConfig {
        question_templates: vec!["Tell us about your space".into()],
        similarity_threshold: 0.99,
        ..Default::default()
    };
    let paragraphs = vec![
        Paragraph::heading("A"),
        Paragraph::plain("Tell us about the space"),
        Paragraph::plain("answer"),
    ];
    assert!(extract_records(&paragraphs, &config).is_empty());
}

// ============================================================
// write_records_csv
// ============================================================

#[test]
fn records_csv_pads_missing_pairs() {
    let paragraphs = vec![
        Paragraph::heading("A"),
        Paragraph::plain(QUESTION_1),
        Paragraph::plain("a1"),
        Paragraph::plain(QUESTION_2),
        Paragraph::plain("a2"),
        Paragraph::heading("B"),
        Paragraph::plain(QUESTION_1),
        Paragraph::plain("b1"),
    ];
    let records = extract_records(&paragraphs, &ExtractConfig::default());
    let path = scratch("records.csv");
    write_records_csv(&records, &path).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(header, vec!["name", "question1", "answer1", "question2", "answer2"]);
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[1][0], "B");
    assert_eq!(&rows[1][2], "b1");
    assert_eq!(&rows[1][4], "");
    std::fs::remove_file(&path).unwrap();
}

// ============================================================
// extract_file real .docx
// ============================================================

fn write_docx(path: &std::path::Path, paragraphs: Vec<docx_rs::Paragraph>) {
    let mut docx = docx_rs::Docx::new();
    for p in paragraphs {
        docx = docx.add_paragraph(p);
    }
    let file = std::fs::File::create(path).unwrap();
    docx.build().pack(file).unwrap();
}

fn text(t: &str) -> docx_rs::Paragraph {
    docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(t))
}

#[test]
fn docx_headings_are_names() {
    let path = scratch("headings.docx");
    write_docx(
        &path,
        vec![
            text("Galerie Est").style("Heading1"),
            text(QUESTION_1),
            text("Un lieu partagé."),
            text("Des résidences."),
        ],
    );
    let records = extract_file(&path, &ExtractConfig::default()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Galerie Est");
    assert_eq!(records[0].pairs[0].answer, "Un lieu partagé. Des résidences.");
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn docx_bold_names_in_bold_mode() {
    let path = scratch("bold.docx");
    write_docx(
        &path,
        vec![
            docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text("Le Hangar").bold()),
            text(QUESTION_2),
            text("Oui."),
        ],
    );
    let config = ExtractConfig {
        name_detection: NameDetection::Bold,
        ..Default::default()
    };
    let records = extract_file(&path, &config).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Le Hangar");
    assert_eq!(records[0].pairs[0].answer, "Oui.");
    std::fs::remove_file(&path).unwrap();
}
