//! Armazenamento em PostGIS
//!
//! Geometrias saem do banco como GeoJSON (`ST_AsGeoJSON`) e entram como
//! EWKT (`ST_GeomFromEWKT`), com o SRID de trabalho prefixado.

use anyhow::{anyhow, Context, Result};
use deadpool_postgres::Pool;
use geo::Geometry;
use geozero::wkt::WktWriter;
use geozero::GeozeroGeometry;
use geoproc::{Feature, Layer, Value};
use tracing::{debug, info};

use crate::config::BancoConfig;
use crate::storage::{LoteNovo, LoteStorage, RemocaoQuadra};

/// Acesso PostGIS às tabelas de quadras, linhas de corte e lotes
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: Pool,
    banco: BancoConfig,
    srid: u32,
}

impl PostgresStorage {
    pub fn new(pool: Pool, banco: BancoConfig, srid: u32) -> Self {
        Self { pool, banco, srid }
    }

    /// Geometria em EWKT com o SRID de trabalho
    fn ewkt(&self, geometria: &Geometry<f64>) -> Result<String> {
        let mut wkt_buf: Vec<u8> = Vec::new();
        let mut writer = WktWriter::new(&mut wkt_buf);
        geometria
            .process_geom(&mut writer)
            .context("Failed to encode geometry as WKT")?;
        let wkt = String::from_utf8(wkt_buf).context("WKT output is not valid UTF-8")?;
        Ok(format!("SRID={};{}", self.srid, wkt))
    }
}

/// Converte a coluna GeoJSON de uma linha do banco
fn geometria_de_geojson(texto: &str) -> Result<Geometry<f64>> {
    let geojson: geojson::Geometry = texto
        .parse()
        .context("Failed to parse GeoJSON geometry from database")?;
    Geometry::try_from(geojson).map_err(|e| anyhow!("Unsupported geometry: {e}"))
}

fn atributo_opcional(valor: Option<i64>) -> Value {
    valor.map(Value::Int).unwrap_or(Value::Null)
}

impl LoteStorage for PostgresStorage {
    async fn carregar_quadras(&self, ids: &[i64]) -> Result<Layer> {
        let client = self.pool.get().await.context("Failed to get connection")?;

        let sql = format!(
            "SELECT id, id_localidade, id_setor, id_bairro, ins_quadra, \
             ST_AsGeoJSON({geom}) AS geojson \
             FROM {schema}.{tabela} WHERE id = ANY($1)",
            geom = self.banco.coluna_geometria,
            schema = self.banco.schema,
            tabela = self.banco.tabela_quadra,
        );

        let ids_vec: Vec<i64> = ids.to_vec();
        let rows = client
            .query(&sql, &[&ids_vec])
            .await
            .context("Failed to load quadras")?;

        let mut layer = Layer::new(Some(self.srid));
        for row in rows {
            let geojson: String = row.try_get("geojson")?;
            let feature = Feature::new(geometria_de_geojson(&geojson)?)
                .with_attribute("id", atributo_opcional(row.try_get("id")?))
                .with_attribute("id_localidade", atributo_opcional(row.try_get("id_localidade")?))
                .with_attribute("id_setor", atributo_opcional(row.try_get("id_setor")?))
                .with_attribute("id_bairro", atributo_opcional(row.try_get("id_bairro")?))
                .with_attribute("ins_quadra", atributo_opcional(row.try_get("ins_quadra")?));
            let indice = layer.len();
            layer.push(feature);
            layer.selected.insert(indice);
        }

        debug!(quadras = layer.len(), "Quadras carregadas");
        Ok(layer)
    }

    async fn carregar_linhas_corte(&self) -> Result<Layer> {
        let client = self.pool.get().await.context("Failed to get connection")?;

        let sql = format!(
            "SELECT ST_AsGeoJSON({geom}) AS geojson FROM {schema}.{tabela}",
            geom = self.banco.coluna_geometria,
            schema = self.banco.schema,
            tabela = self.banco.tabela_linha_corte,
        );

        let rows = client
            .query(&sql, &[])
            .await
            .context("Failed to load cut lines")?;

        let mut layer = Layer::new(Some(self.srid));
        for row in rows {
            let geojson: String = row.try_get("geojson")?;
            layer.push(Feature::new(geometria_de_geojson(&geojson)?));
        }

        debug!(linhas = layer.len(), "Linhas de corte carregadas");
        Ok(layer)
    }

    async fn inserir_lotes(&self, lotes: &[LoteNovo]) -> Result<u64> {
        if lotes.is_empty() {
            return Ok(0);
        }

        let mut client = self.pool.get().await.context("Failed to get connection")?;
        let tx = client
            .transaction()
            .await
            .context("Failed to start transaction")?;

        let sql = format!(
            "INSERT INTO {schema}.{tabela} \
             ({geom}, id_localidade, id_setor, id_bairro, id_quadra, ins_quadra, \
              sit_imovel, usuario, data_atual) \
             VALUES (ST_GeomFromEWKT($1), $2, $3, $4, $5, $6, $7, $8, $9::date)",
            schema = self.banco.schema,
            tabela = self.banco.tabela_lote,
            geom = self.banco.coluna_geometria,
        );
        let stmt = tx.prepare(&sql).await.context("Failed to prepare insert")?;

        let mut inseridos = 0u64;
        for lote in lotes {
            let ewkt = self.ewkt(&lote.geometria)?;
            inseridos += tx
                .execute(
                    &stmt,
                    &[
                        &ewkt,
                        &lote.id_localidade,
                        &lote.id_setor,
                        &lote.id_bairro,
                        &lote.id_quadra,
                        &lote.ins_quadra,
                        &lote.sit_imovel,
                        &lote.usuario,
                        &lote.data_atual,
                    ],
                )
                .await
                .context("Failed to insert lote")?;
        }

        tx.commit().await.context("Failed to commit inserts")?;
        info!(lotes = inseridos, "Lotes inseridos");
        Ok(inseridos)
    }

    async fn remover_lotes(&self, id_quadra: i64) -> Result<RemocaoQuadra> {
        let mut client = self.pool.get().await.context("Failed to get connection")?;

        let sql_ids = format!(
            "SELECT id FROM {schema}.{tabela} WHERE id_quadra = $1",
            schema = self.banco.schema,
            tabela = self.banco.tabela_lote,
        );
        let rows = client
            .query(&sql_ids, &[&id_quadra])
            .await
            .context("Failed to list lotes of quadra")?;
        let ids: Vec<i64> = rows
            .iter()
            .map(|row| row.try_get::<_, i64>("id"))
            .collect::<Result<_, _>>()?;

        if ids.is_empty() {
            return Ok(RemocaoQuadra {
                encontrados: 0,
                restantes: 0,
            });
        }

        let tx = client
            .transaction()
            .await
            .context("Failed to start transaction")?;

        // dependentes primeiro, lotes por último
        for dependente in &self.banco.dependentes {
            let sql = format!(
                "DELETE FROM {schema}.{tabela} WHERE id_lote = ANY($1)",
                schema = self.banco.schema,
                tabela = dependente,
            );
            let removidos = tx
                .execute(&sql, &[&ids])
                .await
                .with_context(|| format!("Failed to clear dependent table {dependente}"))?;
            debug!(tabela = %dependente, linhas = removidos, "Dependentes removidos");
        }

        let sql_delete = format!(
            "DELETE FROM {schema}.{tabela} WHERE id = ANY($1)",
            schema = self.banco.schema,
            tabela = self.banco.tabela_lote,
        );
        tx.execute(&sql_delete, &[&ids])
            .await
            .context("Failed to delete lotes")?;

        let sql_count = format!(
            "SELECT COUNT(*) AS restantes FROM {schema}.{tabela} WHERE id = ANY($1)",
            schema = self.banco.schema,
            tabela = self.banco.tabela_lote,
        );
        let row = tx
            .query_one(&sql_count, &[&ids])
            .await
            .context("Failed to verify removal")?;
        let restantes: i64 = row.try_get("restantes")?;

        tx.commit().await.context("Failed to commit removal")?;
        info!(
            quadra = id_quadra,
            encontrados = ids.len(),
            restantes,
            "Remoção concluída"
        );

        Ok(RemocaoQuadra {
            encontrados: ids.len() as u64,
            restantes: restantes as u64,
        })
    }
}
