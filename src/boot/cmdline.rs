/// Arquivo: boot/cmdline.rs
///
/// Propósito: Parser da Linha de Comando do Kernel.
/// Gerencia os parâmetros passados pelo Bootloader (ex: "debug", "bcache.nbuf=64").
///
/// Detalhes de Implementação:
/// - Sem alocação: apenas fatias da string original.
/// - Parâmetros `chave=valor` ou flags (`chave`) separados por espaços.
/// - Se a chave se repete, a última ocorrência vence.

/// Tamanho máximo da linha de comando considerado pelo parser
pub const CMDLINE_MAX_LEN: usize = 256;

/// Visão somente leitura sobre a linha de comando
#[derive(Debug, Clone, Copy)]
pub struct CommandLine<'a> {
    args: &'a str,
}

impl<'a> CommandLine<'a> {
    /// Cria a visão. Bytes além de `CMDLINE_MAX_LEN` são ignorados.
    pub fn new(args: &'a str) -> Self {
        let mut end = args.len().min(CMDLINE_MAX_LEN);
        while !args.is_char_boundary(end) {
            end -= 1;
        }
        Self { args: &args[..end] }
    }

    /// Itera sobre os pares `(chave, valor)`. Flags têm valor vazio.
    pub fn params(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.args
            .split_ascii_whitespace()
            .map(|token| token.split_once('=').unwrap_or((token, "")))
    }

    /// Verifica se uma flag (chave sem valor) ou parâmetro existe.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Obtém o valor de um parâmetro (ex: "bcache.nbuf" -> "64").
    /// Se for flag ("debug"), retorna Some("").
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.params()
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v)
            .last()
    }
}
