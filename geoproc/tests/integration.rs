//! Teste de integração: cadeia completa de corte de uma quadra

use geo::{Area, Geometry, LineString, Polygon};
use geoproc::{Feature, GeometryOps, Layer, ParamValue, Params, Processor, Value};

fn quadra_layer() -> Layer {
    let quadra = Polygon::new(
        LineString::from(vec![
            (0.0, 0.0),
            (100.0, 0.0),
            (100.0, 100.0),
            (0.0, 100.0),
            (0.0, 0.0),
        ]),
        vec![],
    );
    let mut layer = Layer::new(Some(31984));
    layer.push(
        Feature::new(Geometry::Polygon(quadra))
            .with_attribute("id_quadra", Value::Int(15))
            .with_attribute("area_quadra", Value::Float(10000.0)),
    );
    layer.selected.insert(0);
    layer
}

fn cut_lines_layer() -> Layer {
    let mut layer = Layer::new(Some(31984));
    // Quase alcança as bordas; a extensão de 0.3 fecha o contato
    layer.push(Feature::new(Geometry::LineString(LineString::from(vec![
        (0.1, 50.0),
        (99.9, 50.0),
    ]))));
    layer
}

#[test]
fn test_corte_de_quadra_em_dois_lotes() {
    let processor = Processor;

    // Quadra selecionada
    let quadra = processor
        .run(
            "native:saveselectedfeatures",
            Params::new().with("INPUT", ParamValue::Layer(quadra_layer())),
        )
        .unwrap()
        .layer;
    assert_eq!(quadra.len(), 1);

    // Linhas de corte que intersectam a quadra
    let cortes = processor
        .run(
            "native:extractbylocation",
            Params::new()
                .with("INPUT", ParamValue::Layer(cut_lines_layer()))
                .with("INTERSECT", ParamValue::Layer(quadra.clone()))
                .with("PREDICATE", ParamValue::Number(0.0)),
        )
        .unwrap()
        .layer;
    assert_eq!(cortes.len(), 1);

    // Estender as pontas para garantir o contato com a borda
    let estendidas = processor
        .run(
            "native:extendlines",
            Params::new()
                .with("INPUT", ParamValue::Layer(cortes))
                .with("START_DISTANCE", ParamValue::Number(0.3))
                .with("END_DISTANCE", ParamValue::Number(0.3)),
        )
        .unwrap()
        .layer;

    // Contorno da quadra como linhas
    let contorno = processor
        .run(
            "native:polygonstolines",
            Params::new().with("INPUT", ParamValue::Layer(quadra.clone())),
        )
        .unwrap()
        .layer;

    // Rede unificada
    let rede = processor
        .run(
            "native:mergevectorlayers",
            Params::new().with(
                "LAYERS",
                ParamValue::List(vec![
                    ParamValue::Layer(contorno),
                    ParamValue::Layer(estendidas),
                ]),
            ),
        )
        .unwrap()
        .layer;

    let simplificada = processor
        .run(
            "native:simplifygeometries",
            Params::new()
                .with("INPUT", ParamValue::Layer(rede))
                .with("METHOD", ParamValue::Number(0.0))
                .with("TOLERANCE", ParamValue::Number(0.001)),
        )
        .unwrap()
        .layer;

    // Poligonização
    let lotes = processor
        .run(
            "native:polygonize",
            Params::new()
                .with("INPUT", ParamValue::Layer(simplificada))
                .with("KEEP_FIELDS", ParamValue::Bool(false)),
        )
        .unwrap()
        .layer;
    assert_eq!(lotes.len(), 2);

    // Área de cada lote candidato
    let com_area = processor
        .run(
            "qgis:fieldcalculator",
            Params::new()
                .with("INPUT", ParamValue::Layer(lotes))
                .with("FIELD_NAME", ParamValue::Text("area_lote".into()))
                .with("FIELD_TYPE", ParamValue::Number(0.0))
                .with("FORMULA", ParamValue::Text("$area".into())),
        )
        .unwrap()
        .layer;

    // Atributos da quadra de origem
    let com_quadra = processor
        .run(
            "native:joinattributesbylocation",
            Params::new()
                .with("INPUT", ParamValue::Layer(com_area))
                .with("JOIN", ParamValue::Layer(quadra))
                .with("PREDICATE", ParamValue::Number(0.0))
                .with(
                    "JOIN_FIELDS",
                    ParamValue::List(vec![
                        ParamValue::Text("id_quadra".into()),
                        ParamValue::Text("area_quadra".into()),
                    ]),
                )
                .with("METHOD", ParamValue::Number(1.0))
                .with("DISCARD_NONMATCHING", ParamValue::Bool(false))
                .with("PREFIX", ParamValue::Text("".into())),
        )
        .unwrap()
        .layer;

    // Filtro de validade: lote menor que 95% da quadra
    let validos = processor
        .run(
            "native:extractbyexpression",
            Params::new()
                .with("INPUT", ParamValue::Layer(com_quadra))
                .with(
                    "EXPRESSION",
                    ParamValue::Text("\"area_lote\" < \"area_quadra\" * 0.95".into()),
                ),
        )
        .unwrap()
        .layer;

    assert_eq!(validos.len(), 2);
    for lote in &validos.features {
        let area = lote.geometry.unsigned_area();
        assert!((area - 5000.0).abs() < 50.0, "area inesperada: {area}");
        assert_eq!(lote.attribute("id_quadra"), Some(&Value::Int(15)));
    }
}

#[test]
fn test_quadra_sem_corte_nao_gera_lote_valido() {
    let processor = Processor;

    // Sem linha de corte a poligonização devolve a própria quadra,
    // que é reprovada no filtro de 95%
    let contorno = processor
        .run(
            "native:polygonstolines",
            Params::new().with("INPUT", ParamValue::Layer(quadra_layer())),
        )
        .unwrap()
        .layer;

    let lotes = processor
        .run(
            "native:polygonize",
            Params::new()
                .with("INPUT", ParamValue::Layer(contorno))
                .with("KEEP_FIELDS", ParamValue::Bool(false)),
        )
        .unwrap()
        .layer;
    assert_eq!(lotes.len(), 1);

    let com_area = processor
        .run(
            "qgis:fieldcalculator",
            Params::new()
                .with("INPUT", ParamValue::Layer(lotes))
                .with("FIELD_NAME", ParamValue::Text("area_lote".into()))
                .with("FORMULA", ParamValue::Text("$area".into())),
        )
        .unwrap()
        .layer;

    let com_quadra = processor
        .run(
            "native:joinattributesbylocation",
            Params::new()
                .with("INPUT", ParamValue::Layer(com_area))
                .with("JOIN", ParamValue::Layer(quadra_layer()))
                .with(
                    "JOIN_FIELDS",
                    ParamValue::List(vec![ParamValue::Text("area_quadra".into())]),
                )
                .with("METHOD", ParamValue::Number(1.0)),
        )
        .unwrap()
        .layer;

    let validos = processor
        .run(
            "native:extractbyexpression",
            Params::new()
                .with("INPUT", ParamValue::Layer(com_quadra))
                .with(
                    "EXPRESSION",
                    ParamValue::Text("\"area_lote\" < \"area_quadra\" * 0.95".into()),
                ),
        )
        .unwrap()
        .layer;

    assert!(validos.is_empty());
}
