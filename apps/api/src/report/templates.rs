// Static HTML templates. Placeholders use `{{name}}` and are filled by plain substitution.

pub const REPORT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="UTF-8">
<title>Diagnóstico de Competências - {{name}}</title>
<style>
body { font-family: Arial, sans-serif; margin: 20px; font-size: 12px; color: #333; }
.header { text-align: center; border-bottom: 2px solid #3498db; padding-bottom: 15px; margin-bottom: 20px; }
.header h1 { color: #2c3e50; font-size: 20px; margin: 10px 0; }
.info { background: #f8f9fa; padding: 15px; margin: 15px 0; }
.pontuacao-geral { text-align: center; background: #e8f5e8; padding: 20px; margin: 20px 0; }
.pontuacao-numero { font-size: 28px; font-weight: bold; color: #27ae60; }
.competencia { margin: 10px 0; padding: 10px; border-left: 4px solid #3498db; background: #f8f9fa; }
table { width: 100%; border-collapse: collapse; margin: 15px 0; }
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
th { background: #ecf0f1; }
.footer { margin-top: 30px; text-align: center; color: #7f8c8d; font-size: 10px; }
</style>
</head>
<body>
<div class="header">
<h1>Diagnóstico de Competências</h1>
<h2>{{name}}</h2>
</div>
<div class="info">
<p><strong>E-mail:</strong> {{email}}</p>
<p><strong>Celular:</strong> {{phone}}</p>
<p><strong>Data:</strong> {{date}} às {{time}}</p>
</div>
<div class="pontuacao-geral">
<div>Pontuação Geral</div>
<div class="pontuacao-numero">{{overall_score}}/5.00</div>
<div>{{overall_level}}</div>
</div>
<p>{{introduction}}</p>
<h3>Ranking das Competências</h3>
<table>
<tr><th>#</th><th>Competência</th><th>Pontuação</th><th>Nível</th></tr>
{{ranking_rows}}
</table>
<h3>Pontos Fortes</h3>
{{strengths}}
<h3>Oportunidades de Desenvolvimento</h3>
{{opportunities}}
{{plan_section}}
<div class="footer">
<p>Faça Bem - Desenvolvimento de Competências</p>
</div>
</body>
</html>
"#;

pub const PLAN_SECTION_TEMPLATE: &str = r#"<h3>Plano de Desenvolvimento</h3>
{{plan_items}}"#;

pub const LOCKED_PLAN_SECTION: &str = r#"<h3>Plano de Desenvolvimento</h3>
<p>O plano de desenvolvimento personalizado está disponível na versão premium.</p>"#;

/// HTML body of the notification e-mail, wrapping the rendered report.
pub const EMAIL_HTML_TEMPLATE: &str = r#"<html>
<body style="font-family: Arial, sans-serif; margin: 20px; color: #333;">
<div style="background: #3498db; color: white; padding: 20px; text-align: center;">
<h1>Diagnóstico de Competências</h1>
<h2>{{name}}</h2>
</div>
<div style="font-size: 24px; font-weight: bold; color: #27ae60; text-align: center; margin: 20px 0;">Pontuação Geral: {{overall_score}}/5.00</div>
{{content}}
<div style="margin-top: 30px; text-align: center; color: #7f8c8d; font-size: 12px;">
<p>Relatório gerado em {{generated_at}}</p>
<p><strong>Faça Bem - Desenvolvimento de Competências</strong></p>
</div>
</body>
</html>
"#;

pub const EMAIL_TEXT_TEMPLATE: &str = "Olá {{name}},

Seu diagnóstico de competências foi concluído com sucesso!

PONTUAÇÃO GERAL: {{overall_score}}/5.00

{{report_note}}

Atenciosamente,
Equipe Faça Bem
Desenvolvimento de Competências

Data: {{generated_at}}
";
