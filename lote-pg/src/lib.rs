//! Geração e remoção de lotes urbanos em PostGIS
//!
//! Fluxo de geração: as quadras selecionadas são cortadas pelas linhas
//! de corte em um pipeline fixo de operações de geoprocessamento
//! ([`pipeline`]); os polígonos resultantes são validados pela fração
//! de área ([`validation`]) e gravados na tabela de lotes
//! ([`storage`]). O fluxo de remoção limpa as tabelas dependentes antes
//! de apagar os lotes.
//!
//! A seleção interativa de quadras ([`selection`]) e o agendamento de
//! notificações ([`notify`]) são máquinas de estado puras, testáveis
//! sem banco nem interface.

pub mod batch;
pub mod cli;
pub mod config;
pub mod display;
pub mod io;
pub mod notify;
pub mod pipeline;
pub mod report;
pub mod selection;
pub mod storage;
pub mod validation;

pub use batch::{gerar_lotes, remover_lotes};
pub use config::Config;
pub use pipeline::{CutPipeline, CutRun, Operador, PipelineError};
pub use report::{BatchCategory, BatchKind, BatchReport, BatchReportBuilder};
pub use storage::{LoteNovo, LoteStorage, RemocaoQuadra};
