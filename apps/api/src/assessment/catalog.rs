//! Static reference table of development actions, keyed by category key.
//! Each category carries three degrees (grau 1..3) of three actions, from
//! foundational habits to systemic practices.

/// Number of degrees every catalog entry carries.
pub const DEGREES: usize = 3;

#[derive(Debug)]
pub struct CatalogEntry {
    pub key: &'static str,
    /// Index 0 is degree 1.
    pub degrees: [&'static [&'static str]; DEGREES],
}

pub static ACTION_CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        key: "comunicacao",
        degrees: [
            &[
                "Praticar Escuta Ativa por 5 min",
                "Implementar Pausa de 3 segundos",
                "Fazer 1 pergunta de curiosidade por dia",
            ],
            &[
                "Praticar Comunicação Não-Violenta",
                "Implementar Feedback Semanal Estruturado",
                "Criar Ritual de Check-in Emocional",
            ],
            &[
                "Desenvolver Comunicação Adaptativa",
                "Implementar Storytelling Estruturado",
                "Criar Sistema de Comunicação Proativa",
            ],
        ],
    },
    CatalogEntry {
        key: "organizacao",
        degrees: [
            &[
                "Implementar Regra dos 2 Minutos",
                "Criar Sistema de Captura Única",
                "Implementar Organização de 5 Minutos",
            ],
            &[
                "Implementar Método GTD Simplificado",
                "Criar Rotinas de Preparação",
                "Implementar Sistema de Arquivo Ativo",
            ],
            &[
                "Criar Sistema de Gestão de Energia",
                "Implementar Organização Preditiva",
                "Desenvolver Organização Sistêmica",
            ],
        ],
    },
    CatalogEntry {
        key: "proatividade",
        degrees: [
            &[
                "Implementar Regra dos 10 Minutos",
                "Criar Lista de Próximas Ações",
                "Implementar Revisão Semanal de 15 min",
            ],
            &[
                "Desenvolver Antecipação Estratégica",
                "Criar Sistema de Oportunidades",
                "Implementar Melhoria Contínua Pessoal",
            ],
            &[
                "Desenvolver Liderança Proativa",
                "Criar Inovação Sistemática",
                "Implementar Impacto Multiplicador",
            ],
        ],
    },
    CatalogEntry {
        key: "pensamento_critico",
        degrees: [
            &[
                "Praticar Questionamento dos 5 Porquês",
                "Implementar Pausa Reflexiva Diária",
                "Buscar Perspectiva Contrária Diária",
            ],
            &[
                "Desenvolver Análise de Vieses",
                "Implementar Pensamento Probabilístico",
                "Criar Prática de Argumentação Estruturada",
            ],
            &[
                "Desenvolver Pensamento Sistêmico",
                "Implementar Tomada de Decisão Baseada em Evidências",
                "Criar Sistema de Metacognição",
            ],
        ],
    },
    CatalogEntry {
        key: "produtividade",
        degrees: [
            &[
                "Limitar WIP a 3 tarefas",
                "Fazer Planejamento Semanal de 15 min",
                "Aplicar Método 2-Listas Buffett",
            ],
            &[
                "Implementar Técnica Pomodoro Avançada",
                "Criar Sistema de Batching",
                "Desenvolver Rituais de Transição",
            ],
            &[
                "Implementar Produtividade Baseada em Energia",
                "Criar Sistema de Automação Pessoal",
                "Implementar Otimização Contínua de Performance",
            ],
        ],
    },
];

pub fn lookup(key: &str) -> Option<&'static CatalogEntry> {
    ACTION_CATALOG.iter().find(|entry| entry.key == key)
}
